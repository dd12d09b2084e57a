use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RunArgs {
    pub device: Option<String>,
    pub mqtt_host: Option<String>,
    pub mqtt_port: Option<u16>,
    pub json: bool,
}

#[derive(Debug, Default)]
pub struct ListenArgs {
    pub device: Option<String>,
}

#[derive(Debug)]
pub struct CaptureArgs {
    pub device: Option<String>,
    pub duration: Duration,
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct DecodeArgs {
    pub hex: String,
    pub json: bool,
}

#[derive(Debug)]
pub struct ReplayArgs {
    pub file: PathBuf,
    pub json: bool,
}

#[derive(Debug, Default)]
pub struct SensorsArgs {
    pub json: bool,
}

#[derive(Debug, Default)]
pub struct CheckUartArgs {
    pub device: Option<String>,
}
