//! Checks against a real meter. Run with `--ignored` with a U1232A on `DEVICE_NAME`.

use arcs_dmm::{ AgilentU1232A, Driver };

const DEVICE_NAME: &'static str = "/dev/ttyUSB0";

#[tokio::test]
#[ignore]
async fn u1232a_identifies_and_measures()
{
    let device = AgilentU1232A::new(&format!("{}:9600,N,8,1", DEVICE_NAME)).unwrap();

    assert!(device.connect().await);

    let id = device.identification().await;
    assert_eq!(id.model.as_deref(), Some("U1232A"));
    assert!(id.firmware_version.is_some());

    let measurement = device.current_measurement().await.unwrap();
    assert!(device.supported_measurements().contains(&measurement.measurement_type()));
    println!("{} on {}", measurement, measurement.range());

    device.disconnect().await;
    assert!(!device.is_connected());
}
