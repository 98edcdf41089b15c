pub mod devices;
pub mod error;
pub mod extract;
pub mod facade;
pub mod routes;
pub mod sweeper;
pub mod validation;

use std::sync::Arc;

use crate::facade::DeviceFacade;
use crate::sweeper::Sweeper;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub devices: DeviceFacade,
    pub sweeper: Arc<Sweeper>,
}

impl AppStateInner {
    pub fn new(devices: DeviceFacade) -> Self {
        let sweeper = Arc::new(Sweeper::new(devices.clone()));
        Self { devices, sweeper }
    }
}
