pub mod domains;
pub mod voltage;

pub use domains::PowerDomainController;
pub use voltage::{PowerStatus, VoltageCalibration, VoltageMonitor};

use serde::{Deserialize, Serialize};

/// Switchable peripheral power domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerDomain {
    Gnss,
    Modem,
    Charger,
}

impl PowerDomain {
    pub const ALL: [PowerDomain; 3] = [PowerDomain::Gnss, PowerDomain::Modem, PowerDomain::Charger];
}
