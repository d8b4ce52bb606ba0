//! Device directory.

use crate::error::ClientError;
use crate::transport::{Accept, Transport};
use fleet_core::Device;

/// Fetch the device directory snapshot.
pub async fn fetch_devices<T: Transport>(transport: &T) -> Result<Vec<Device>, ClientError> {
    let response = transport
        .get("/api/devices", &[], Accept::Json)
        .await?
        .error_for_status()?;
    let devices: Option<Vec<Device>> = response.json()?;
    let devices = devices.unwrap_or_default();
    tracing::debug!(count = devices.len(), "device directory loaded");
    Ok(devices)
}
