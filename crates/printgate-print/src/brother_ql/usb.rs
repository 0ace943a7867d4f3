// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// USB access to Brother QL printers through libusb.
//
// Everything here blocks. Callers run it on tokio's blocking pool.

use std::time::Duration;

use rusb::{Device, DeviceDescriptor, DeviceHandle, Direction, GlobalContext, TransferType, UsbContext};
use tracing::{debug, info, warn};

use printgate_core::error::{PrintgateError, Result};

pub const BROTHER_VENDOR_ID: u16 = 0x04f9;

const PRINTER_CLASS: u8 = 0x07;
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A QL printer seen on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbPrinter {
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl UsbPrinter {
    /// `usb://0x04f9:0x2020/A1B2C3`
    pub fn identifier(&self) -> String {
        format!("usb://0x{:04x}:0x{:04x}/{}", self.vendor_id, self.product_id, self.serial)
    }

    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.manufacturer, self.product, self.serial)
    }
}

/// Parse an identifier produced by [`UsbPrinter::identifier`].
pub fn parse_identifier(identifier: &str) -> Option<(u16, u16, &str)> {
    let rest = identifier.strip_prefix("usb://")?;
    let (ids, serial) = rest.split_once('/')?;
    let (vendor, product) = ids.split_once(':')?;
    let hex = |s: &str| u16::from_str_radix(s.strip_prefix("0x")?, 16).ok();
    Some((hex(vendor)?, hex(product)?, serial))
}

/// An open bulk channel to one printer.
pub trait LabelTransport: Send {
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is waiting. `Ok(0)` when nothing arrived in time.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Enumerates and opens QL printers.
pub trait UsbBus: Send + Sync {
    /// Whether libusb can be initialised at all.
    fn probe(&self) -> bool;

    fn list(&self) -> Result<Vec<UsbPrinter>>;

    fn open(&self, identifier: &str) -> Result<Box<dyn LabelTransport>>;
}

/// The host's USB bus, through libusb's global context.
#[derive(Debug, Default, Clone, Copy)]
pub struct RusbBus;

impl UsbBus for RusbBus {
    fn probe(&self) -> bool {
        match rusb::devices() {
            Ok(_) => true,
            Err(err) => {
                info!(error = %err, "libusb unavailable");
                false
            }
        }
    }

    fn list(&self) -> Result<Vec<UsbPrinter>> {
        let devices = rusb::devices().map_err(usb_error)?;
        let mut printers = Vec::new();
        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if descriptor.vendor_id() != BROTHER_VENDOR_ID || printer_interface(&device).is_none() {
                continue;
            }
            let handle = match device.open() {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(
                        bus = device.bus_number(),
                        address = device.address(),
                        error = %err,
                        "Cannot open Brother device"
                    );
                    continue;
                }
            };
            let printer = describe(&handle, &descriptor);
            if !printer.product.starts_with("QL-") {
                debug!(product = %printer.product, "Ignoring non-QL Brother device");
                continue;
            }
            debug!(identifier = %printer.identifier(), "Found QL printer");
            printers.push(printer);
        }
        Ok(printers)
    }

    fn open(&self, identifier: &str) -> Result<Box<dyn LabelTransport>> {
        let (vendor_id, product_id, serial) = parse_identifier(identifier)
            .ok_or_else(|| PrintgateError::Usb(format!("malformed USB identifier '{identifier}'")))?;
        let devices = rusb::devices().map_err(usb_error)?;
        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if descriptor.vendor_id() != vendor_id || descriptor.product_id() != product_id {
                continue;
            }
            let Ok(handle) = device.open() else {
                continue;
            };
            if describe(&handle, &descriptor).serial != serial {
                continue;
            }
            return Ok(Box::new(RusbTransport::claim(&device, handle)?));
        }
        Err(PrintgateError::Usb(format!("printer {identifier} is not connected")))
    }
}

fn describe<T: UsbContext>(handle: &DeviceHandle<T>, descriptor: &DeviceDescriptor) -> UsbPrinter {
    UsbPrinter {
        manufacturer: handle
            .read_manufacturer_string_ascii(descriptor)
            .unwrap_or_else(|_| "Brother".into()),
        product: handle.read_product_string_ascii(descriptor).unwrap_or_default(),
        serial: handle.read_serial_number_string_ascii(descriptor).unwrap_or_default(),
        vendor_id: descriptor.vendor_id(),
        product_id: descriptor.product_id(),
    }
}

/// Interface number and bulk endpoints of the printer-class interface.
struct Endpoints {
    interface: u8,
    bulk_in: u8,
    bulk_out: u8,
}

fn printer_interface<T: UsbContext>(device: &Device<T>) -> Option<Endpoints> {
    let config = device.active_config_descriptor().ok()?;
    for interface in config.interfaces() {
        for alt in interface.descriptors() {
            if alt.class_code() != PRINTER_CLASS {
                continue;
            }
            let mut bulk_in = None;
            let mut bulk_out = None;
            for endpoint in alt.endpoint_descriptors() {
                if endpoint.transfer_type() != TransferType::Bulk {
                    continue;
                }
                match endpoint.direction() {
                    Direction::In => bulk_in = Some(endpoint.address()),
                    Direction::Out => bulk_out = Some(endpoint.address()),
                }
            }
            if let (Some(bulk_in), Some(bulk_out)) = (bulk_in, bulk_out) {
                return Some(Endpoints {
                    interface: alt.interface_number(),
                    bulk_in,
                    bulk_out,
                });
            }
        }
    }
    None
}

struct RusbTransport {
    handle: DeviceHandle<GlobalContext>,
    endpoints: Endpoints,
}

impl RusbTransport {
    fn claim(device: &Device<GlobalContext>, mut handle: DeviceHandle<GlobalContext>) -> Result<Self> {
        let endpoints = printer_interface(device)
            .ok_or_else(|| PrintgateError::Usb("device has no printer interface".into()))?;
        // Not every platform can detach kernel drivers; usblp only matters on Linux.
        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            debug!(error = %err, "auto-detach of kernel driver unavailable");
        }
        handle.claim_interface(endpoints.interface).map_err(usb_error)?;
        Ok(Self { handle, endpoints })
    }
}

impl LabelTransport for RusbTransport {
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let written = self
                .handle
                .write_bulk(self.endpoints.bulk_out, data, WRITE_TIMEOUT)
                .map_err(usb_error)?;
            if written == 0 {
                return Err(PrintgateError::Usb("printer accepted no data".into()));
            }
            data = &data[written..];
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.handle.read_bulk(self.endpoints.bulk_in, buf, READ_TIMEOUT) {
            Ok(n) => Ok(n),
            Err(rusb::Error::Timeout) => Ok(0),
            Err(err) => Err(usb_error(err)),
        }
    }
}

impl Drop for RusbTransport {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(self.endpoints.interface);
    }
}

fn usb_error(err: rusb::Error) -> PrintgateError {
    PrintgateError::Usb(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ql1050() -> UsbPrinter {
        UsbPrinter {
            manufacturer: "Brother".into(),
            product: "QL-1050".into(),
            serial: "A1B2C3".into(),
            vendor_id: BROTHER_VENDOR_ID,
            product_id: 0x2020,
        }
    }

    #[test]
    fn identifier_format() {
        assert_eq!(ql1050().identifier(), "usb://0x04f9:0x2020/A1B2C3");
        assert_eq!(ql1050().display_name(), "Brother QL-1050 (A1B2C3)");
    }

    #[test]
    fn identifiers_parse_back() {
        assert_eq!(
            parse_identifier(&ql1050().identifier()),
            Some((0x04f9, 0x2020, "A1B2C3"))
        );
        assert_eq!(parse_identifier("usb://0x04f9:0x2020/"), Some((0x04f9, 0x2020, "")));
        assert_eq!(parse_identifier("Office_Laser"), None);
        assert_eq!(parse_identifier("usb://04f9:2020/X"), None);
    }
}
