use minsmtp::AppConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    minsmtp::init_logging();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = minsmtp::run(config).await {
        log::error!("Admin endpoint stopped: {}", e);
        std::process::exit(1);
    }
}
