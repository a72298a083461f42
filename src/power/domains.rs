use super::PowerDomain;
use crate::hal::{Line, PinMode, Platform};
use tracing::debug;

/// Pin-level owner of the peripheral power domains.
///
/// Each domain is a single active-high enable line. A disabled domain's
/// line is parked as a floating input so the pin does not leak through
/// downstream pull networks; it is reconfigured as a driven output only
/// while the domain is on.
///
/// The GNSS/modem mutual-exclusion rule (shared RF switch) is enforced by
/// the sequencer's ordering, not re-checked here.
#[derive(Debug)]
pub struct PowerDomainController {
    gnss_enabled: bool,
    modem_enabled: bool,
    charger_enabled: bool,
}

impl PowerDomainController {
    /// Creates the controller and drives every enable line to the
    /// known-off state.
    pub fn new<P: Platform>(platform: &mut P) -> Self {
        for domain in PowerDomain::ALL {
            let line = Self::line_for(domain);
            platform.pin_mode(line, PinMode::Output);
            platform.pin_write(line, false);
            platform.pin_mode(line, PinMode::InputFloating);
        }
        Self {
            gnss_enabled: false,
            modem_enabled: false,
            charger_enabled: false,
        }
    }

    fn line_for(domain: PowerDomain) -> Line {
        match domain {
            PowerDomain::Gnss => Line::GnssPower,
            PowerDomain::Modem => Line::ModemPower,
            PowerDomain::Charger => Line::ChargerEnable,
        }
    }

    fn flag_mut(&mut self, domain: PowerDomain) -> &mut bool {
        match domain {
            PowerDomain::Gnss => &mut self.gnss_enabled,
            PowerDomain::Modem => &mut self.modem_enabled,
            PowerDomain::Charger => &mut self.charger_enabled,
        }
    }

    pub fn is_enabled(&self, domain: PowerDomain) -> bool {
        match domain {
            PowerDomain::Gnss => self.gnss_enabled,
            PowerDomain::Modem => self.modem_enabled,
            PowerDomain::Charger => self.charger_enabled,
        }
    }

    pub fn enable<P: Platform>(&mut self, platform: &mut P, domain: PowerDomain) {
        if self.is_enabled(domain) {
            return;
        }
        let line = Self::line_for(domain);
        platform.pin_mode(line, PinMode::Output);
        platform.pin_write(line, true);
        *self.flag_mut(domain) = true;
        debug!(?domain, "power domain enabled");
    }

    /// Disables a domain. Calling this on an already-disabled domain is a
    /// behavioral no-op: no pin transitions are produced.
    pub fn disable<P: Platform>(&mut self, platform: &mut P, domain: PowerDomain) {
        if !self.is_enabled(domain) {
            return;
        }
        let line = Self::line_for(domain);
        platform.pin_write(line, false);
        platform.pin_mode(line, PinMode::InputFloating);
        *self.flag_mut(domain) = false;
        debug!(?domain, "power domain disabled");
    }

    /// Disables every domain. Safe regardless of which domains were
    /// enabled this cycle.
    pub fn disable_all<P: Platform>(&mut self, platform: &mut P) {
        for domain in PowerDomain::ALL {
            self.disable(platform, domain);
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.gnss_enabled || self.modem_enabled || self.charger_enabled
    }
}
