use kwartiwi_p1::{api, discovery, predictor, serial, store, wifi, Store, CONFIG};
use std::{env, time::Duration};
use tokio::task::JoinHandle;
use log::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let default_filter = std::env::var("KWARTIWI_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    env::set_var("RUST_BACKTRACE", "1");

    let (serial_config, httpd_config, wifi_config, mdns_config, predictor_method) = {
        let config = CONFIG.read().unwrap().get_complete_config();
        (
            config.serial,
            config.httpd,
            config.wifi,
            config.mdns,
            config.predictor.method,
        )
    };

    wifi::bring_up(&wifi_config);

    let app_store = Store::new();

    let mut threads: Vec<JoinHandle<()>> = Vec::new();

    // P1 reader (spec.md §5 "P1 reader").
    let reader_store = app_store.clone();
    threads.push(tokio::spawn(async move {
        serial::run(reader_store, serial_config).await;
    }));

    // Logger (spec.md §5 "Logger").
    let logger_store = app_store.clone();
    threads.push(tokio::spawn(async move {
        store::logger::run(logger_store).await;
    }));

    // Peak predictor (spec.md §5 "Peak predictor").
    let predictor_store = app_store.clone();
    threads.push(tokio::spawn(async move {
        predictor::run(predictor_store, predictor_method).await;
    }));

    let httpd_port = httpd_config.port;

    // HTTP read API (spec.md §4.5, §6 "HTTP API"). Kept outside the
    // supervision loop below: once actix's server future resolves the
    // process has nothing left worth supervising for, so a failure here
    // surfaces to the caller rather than being silently monitored.
    let api_store = app_store.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::run(api_store, httpd_config).await {
            log::error!("HTTP API exited: {e}");
        }
    });

    // mDNS advertisement (spec.md §6 "Service discovery"). The daemon
    // handle is held for the process lifetime; dropping it would withdraw
    // the advertisement.
    let _mdns_daemon = discovery::advertise(&wifi_config, &mdns_config, httpd_port);

    // Periodic config autosave (spec.md §6 "Persistent configuration").
    threads.push(tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let mut c = CONFIG.write().unwrap();
            if c.is_dirty() {
                c.save();
            }
        }
    }));

    info!("All tasks started, now waiting for a signal to exit");
    loop {
        tokio::time::sleep(Duration::from_secs(10)).await;
        let mut should_exit = api_handle.is_finished();
        for task in threads.iter() {
            if task.is_finished() {
                should_exit = true;
            }
        }

        if should_exit {
            api_handle.abort();
            for task in threads.iter_mut() {
                task.abort();
            }
            break;
        }
    }
    Ok(())
}
