//! Device model lookup.

use serde::{Deserialize, Serialize};

const UNKNOWN_MODEL_NAME: &str = "Govee - Unknown";

/// SKUs known to speak the LAN API, with their marketing names.
const KNOWN_MODELS: &[(&str, &str)] = &[
    ("H6046", "Govee RGBIC TV Light Bars"),
    ("H6047", "Govee RGBIC Gaming Light Bars"),
    ("H6051", "Govee Aura Lite Table Lamp"),
    ("H6052", "Govee Aura Smart Table Lamp"),
    ("H6056", "Govee RGBICWW WiFi + Bluetooth Flow Plus Light Bars"),
    ("H6059", "Govee RGBWW Night Light"),
    ("H6061", "Govee Glide Hexa Light Panels"),
    ("H6062", "Govee Glide Wall Light"),
    ("H6065", "Govee Glide Y Lights"),
    ("H6066", "Govee Glide Hexa Pro Light Panels"),
    ("H6067", "Govee Triangle Light Panels"),
    ("H6072", "Govee Lyra RGBICWW Corner Floor Lamp"),
    ("H6073", "Govee LED Floor Lamp"),
    ("H6076", "Govee RGBICWW Smart Corner Floor Lamp"),
    ("H6087", "Govee RGBIC Smart Wall Sconces"),
    ("H610A", "Govee RGBIC LED Wall Light"),
    ("H610B", "Govee RGBIC LED Wall Lights"),
    ("H6110", "Govee Wi-Fi RGB LED Strip Lights"),
    ("H6117", "Govee 32.8ft RGBIC LED Strip Lights"),
    ("H6141", "Govee Smart LED Strip Lights"),
    ("H6143", "Govee RGBIC Alexa LED Strip Lights"),
    ("H6144", "Govee RGBIC Wi-Fi+Bluetooth LED Strip Lights"),
    ("H6159", "Govee Smart LED Strip Lights"),
    ("H615A", "Govee Smart WiFi LED Strip Lights"),
    ("H615B", "Govee LED Strip Lights"),
    ("H615C", "Govee Smart WiFi LED Strip Lights"),
    ("H6163", "Govee 16.4ft RGBIC LED Strip Lights"),
    ("H6172", "Govee Wi-Fi RGBIC Outdoor Strip Lights"),
    ("H618A", "Govee RGBIC Basic Wi-Fi + Bluetooth LED Strip Lights"),
    ("H618C", "Govee RGBIC Basic Wi-Fi + Bluetooth LED Strip Lights (1*10m)"),
    ("H618E", "Govee RGBIC Basic Wi-Fi + Bluetooth LED Strip Lights (2*10m)"),
    ("H618F", "Govee RGBIC Basic Wi-Fi + Bluetooth LED Strip Lights (1*50m)"),
    ("H619A", "Govee RGBIC Wi-Fi + Bluetooth Strip Lights (1*5m)"),
    ("H619B", "Govee RGBIC Wi-Fi + Bluetooth LED Strip Lights"),
    ("H619C", "Govee RGBIC Wi-Fi + Bluetooth Strip Lights (1*10m)"),
    ("H619D", "Govee RGBIC Wi-Fi + Bluetooth Strip Lights (2*10m)"),
    ("H619E", "Govee RGBIC Wi-Fi + Bluetooth Strip Lights (2*10m)"),
    ("H619Z", "Govee RGBIC Pro LED Strip Lights"),
    ("H61A0", "Govee Neon LED Strip Light (3m)"),
    ("H61A1", "Govee Neon LED Strip Light (2m)"),
    ("H61A2", "Govee Neon LED Strip Light (5m)"),
    ("H61A3", "Govee RGBIC Neon Rope Light (4m)"),
    ("H61A5", "Govee Neon LED Strip Light (10m)"),
    ("H61B2", "Govee RGBIC Neon TV Backlight"),
    ("H61E1", "Govee LED Strip Light M1"),
    ("H7050", "Govee RGBIC Wi-Fi + Bluetooth Outdoor Ground Lights"),
    ("H7060", "Govee RGBICWW LED Smart Flood Lights"),
    ("H7061", "Govee RGBICWW LED Smart Flood Lights"),
    ("H7062", "Govee RGBICWW LED Smart Flood Lights"),
    ("H7065", "Govee RGBICWW LED Smart Flood Lights"),
];

/// Display information derived from a device's model designator (SKU).
///
/// `supported` is advisory: Govee ships new SKUs regularly and an unknown
/// model is still controlled like any other device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub sku: String,
    pub name: String,
    pub supported: bool,
}

impl DeviceModel {
    /// Look up a SKU such as `"H619A"`, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// use govee_lan_rs::DeviceModel;
    ///
    /// let model = DeviceModel::from_sku("h6159");
    /// assert!(model.supported);
    /// assert_eq!(model.name, "Govee Smart LED Strip Lights");
    ///
    /// let unknown = DeviceModel::from_sku("H9999");
    /// assert!(!unknown.supported);
    /// assert_eq!(unknown.name, "Govee - Unknown");
    /// ```
    pub fn from_sku(sku: &str) -> Self {
        let known = KNOWN_MODELS
            .iter()
            .find(|(known_sku, _)| known_sku.eq_ignore_ascii_case(sku.trim()));

        DeviceModel {
            sku: sku.to_string(),
            name: known.map_or(UNKNOWN_MODEL_NAME, |(_, name)| *name).to_string(),
            supported: known.is_some(),
        }
    }

    /// All SKUs in the lookup table.
    pub fn known_skus() -> impl Iterator<Item = &'static str> {
        KNOWN_MODELS.iter().map(|(sku, _)| *sku)
    }
}
