use std::env;

/// Load a local `.env`, then `$CONFIGURATION_DIRECTORY/ebus-bridge.env` when running under systemd
pub fn load_dotenv() {
    if dotenv::dotenv().is_ok() {
        eprintln!("Loaded local .env")
    }
    if let Ok(conf_dir) = env::var("CONFIGURATION_DIRECTORY") {
        let conf_dotenv = format!("{conf_dir}/ebus-bridge.env");
        if dotenv::from_path(&conf_dotenv).is_ok() {
            eprintln!("Loaded {conf_dotenv}");
        }
    }
}
