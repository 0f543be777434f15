use anyhow::{Context, Result};
use bus_client::{BluezBus, NotificationStream};
use sink_state::{BusDirectory, SinkContext, StartupReport, StateError};
use tracing::{error, info, warn};

use crate::config::Config;

/// Build the tree and prepare the configured adapter
///
/// Fails when the subscription or enumeration fails, or when the adapter is
/// not present; every later step only logs.
pub fn start<B: BluezBus>(bus: B, config: &Config) -> Result<(BusDirectory<B>, NotificationStream)> {
    let ctx = SinkContext::new(bus, config.sink_options()?);

    let (mut directory, stream) =
        BusDirectory::initialize(ctx).context("Failed to read the BlueZ object tree")?;

    let report = match directory.prepare_adapter(&config.adapter) {
        Ok(report) => report,
        Err(StateError::AdapterNotFound(name)) => {
            let known: Vec<&str> = directory.adapters().keys().map(String::as_str).collect();
            error!("Adapter {} not found (available: {:?})", name, known);
            return Err(StateError::AdapterNotFound(name).into());
        }
        Err(e) => return Err(e.into()),
    };
    log_report(&config.adapter, &report);

    Ok((directory, stream))
}

fn log_report(adapter: &str, report: &StartupReport) {
    for property in &report.failed_properties {
        warn!("{} was not set on {}", property.name(), adapter);
    }

    info!(
        "{} of {} endpoint(s) registered on {}",
        report.endpoints.registered.len(),
        report.endpoints.registered.len() + report.endpoints.failed.len(),
        adapter
    );

    if report.is_complete() {
        info!("Adapter {} ready", adapter);
    } else {
        warn!("Adapter {} only partially ready", adapter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use bus_client::mock::MockBus;
    use bus_client::ADAPTER_INTERFACE;
    use clap::Parser;

    fn config(extra: &[&str]) -> Config {
        let mut argv = vec!["a2dp-null-sink"];
        argv.extend_from_slice(extra);
        Config::from(Args::try_parse_from(argv).unwrap())
    }

    fn bus_with_hci0() -> MockBus {
        MockBus::new().with_object("/org/bluez/hci0", &[ADAPTER_INTERFACE])
    }

    #[test]
    fn test_start_prepares_adapter() {
        let (directory, _stream) = start(bus_with_hci0(), &config(&["-c", "mp3,aac"])).unwrap();

        let bus = directory.context().bus();
        assert_eq!(bus.calls_to("Powered").len(), 1);
        assert_eq!(bus.calls_to("Discoverable").len(), 1);
        assert_eq!(bus.calls_to("Pairable").len(), 1);
        assert_eq!(bus.calls_to("RegisterEndpoint").len(), 3);
        assert_eq!(
            directory.lookup_adapter("hci0").unwrap().endpoints().len(),
            3
        );
    }

    #[test]
    fn test_missing_adapter_is_fatal() {
        let result = start(bus_with_hci0(), &config(&["-a", "hci1"]));
        let error = result.err().unwrap();
        assert!(matches!(
            error.downcast_ref::<StateError>(),
            Some(StateError::AdapterNotFound(name)) if name == "hci1"
        ));
    }

    #[test]
    fn test_failed_steps_are_not_fatal() {
        let bus = bus_with_hci0();
        bus.fail_method("Powered");
        bus.fail_method("RegisterEndpoint");

        let (directory, _stream) = start(bus, &config(&["-c", "none"])).unwrap();
        assert_eq!(directory.context().bus().calls_to("Pairable").len(), 1);
        assert!(directory.lookup_adapter("hci0").unwrap().endpoints().is_empty());
    }

    #[test]
    fn test_enumeration_failure_is_fatal() {
        let bus = bus_with_hci0();
        bus.fail_method("GetManagedObjects");
        assert!(start(bus, &config(&[])).is_err());
    }
}
