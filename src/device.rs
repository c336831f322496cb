//! Individual device control.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, warn};
use serde::Serialize;

use crate::errors::Error;
use crate::events::{Event, EventBus, Events};
use crate::fade::{self, MAX_STEPS, MIN_STEPS};
use crate::message::{Command, ScanData, StatusReport};
use crate::model::DeviceModel;
use crate::runtime::{self, TaskGuard};
use crate::status::{DeviceState, LastChanged};
use crate::transport::{self, Transport};
use crate::types::{Brightness, Color, IntoColor, Kelvin, PowerState};

type Result<T> = std::result::Result<T, Error>;

/// Firmware versions reported in a scan reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Versions {
    pub ble_hard: String,
    pub ble_soft: String,
    pub wifi_hard: String,
    pub wifi_soft: String,
}

impl From<&ScanData> for Versions {
    fn from(scan: &ScanData) -> Self {
        Versions {
            ble_hard: scan.ble_version_hard.clone(),
            ble_soft: scan.ble_version_soft.clone(),
            wifi_hard: scan.wifi_version_hard.clone(),
            wifi_soft: scan.wifi_version_soft.clone(),
        }
    }
}

struct DeviceInner {
    id: String,
    model: DeviceModel,
    versions: Versions,
    ip: Mutex<Ipv4Addr>,
    state: Mutex<DeviceState>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    events: Arc<EventBus>,
    update_interval: Duration,
    auto_update: Mutex<Option<TaskGuard>>,
}

/// A Govee device found on the LAN.
///
/// Devices are created by the [`crate::Registry`] when a scan reply names an
/// identity it has not seen before. Clones share the same record.
///
/// Commands resolve once the datagram is handed to the network; the device
/// never acknowledges them. The local state is updated optimistically right
/// after a successful send, and corrected by the next status reply.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.inner.id)
            .field("model", &self.inner.model.sku)
            .field("ip", &self.ip())
            .finish()
    }
}

/// Minimum total duration of a fade.
pub const MIN_FADE_DURATION: Duration = Duration::from_millis(100);
/// Maximum total duration of a fade.
pub const MAX_FADE_DURATION: Duration = Duration::from_millis(100_000_000);
/// Interval between status requests while [`Device::sync_now`] waits.
pub const SYNC_RETRY_INTERVAL: Duration = Duration::from_millis(50);

impl Device {
    pub(crate) fn new(
        scan: &ScanData,
        transport: Arc<dyn Transport>,
        events: Arc<EventBus>,
        update_interval: Duration,
    ) -> Self {
        Device {
            inner: Arc::new(DeviceInner {
                id: scan.device.clone(),
                model: DeviceModel::from_sku(&scan.sku),
                versions: Versions::from(scan),
                ip: Mutex::new(scan.ip),
                state: Mutex::new(DeviceState::new()),
                transport: Mutex::new(Some(transport)),
                events,
                update_interval,
                auto_update: Mutex::new(None),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DeviceState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn update_state(&self, f: impl FnOnce(&mut DeviceState)) {
        f(&mut self.lock_state());
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Model designator, e.g. `"H6159"`.
    pub fn model(&self) -> &str {
        &self.inner.model.sku
    }

    /// Display name of the model.
    pub fn name(&self) -> &str {
        &self.inner.model.name
    }

    /// Whether the model is in the known model table. Advisory only.
    pub fn supported(&self) -> bool {
        self.inner.model.supported
    }

    pub fn versions(&self) -> &Versions {
        &self.inner.versions
    }

    /// Last known address of the device.
    pub fn ip(&self) -> Ipv4Addr {
        *self.inner.ip.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_on(&self) -> bool {
        self.lock_state().is_on()
    }

    pub fn brightness(&self) -> u8 {
        self.lock_state().brightness.value()
    }

    pub fn color(&self) -> Color {
        self.lock_state().color
    }

    pub fn color_temperature(&self) -> u32 {
        self.lock_state().color_temperature
    }

    pub fn last_changed(&self) -> LastChanged {
        self.lock_state().last_changed
    }

    /// Whether at least one status reply has been received.
    pub fn is_synchronized(&self) -> bool {
        self.lock_state().synchronized
    }

    /// Snapshot of the current state, including sync timestamps.
    ///
    /// Not guaranteed to be up to date; see [`Device::wait_for_first_update`]
    /// and [`Device::sync_now`].
    pub fn state(&self) -> DeviceState {
        self.lock_state().clone()
    }

    /// Fails with [`Error::Destroyed`] once the device has been destroyed.
    fn transport(&self) -> Result<Arc<dyn Transport>> {
        self.inner
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Destroyed)
    }

    async fn send(&self, command: Command) -> Result<()> {
        let transport = self.transport()?;
        let bytes = command.encode()?;
        let addr = transport::command_addr(self.ip());
        debug!("sending {} to {} at {addr}", command.kind(), self.inner.id);
        transport
            .send_datagram(&bytes, addr)
            .await
            .map_err(|e| Error::socket("send", e))?;
        Ok(())
    }

    pub async fn set_power(&self, power: PowerState) -> Result<()> {
        self.send(Command::turn(power)).await?;
        self.update_state(|state| state.power = power);
        Ok(())
    }

    pub async fn turn_on(&self) -> Result<()> {
        self.set_power(PowerState::On).await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.set_power(PowerState::Off).await
    }

    /// Set the brightness in percent; values outside `0..=100` are clamped.
    pub async fn set_brightness(&self, brightness: i64) -> Result<()> {
        let brightness = Brightness::clamped(brightness);
        self.send(Command::brightness(brightness)).await?;
        self.update_state(|state| state.brightness = brightness);
        Ok(())
    }

    /// Set the white color temperature, clamped to `1000..=9000` K.
    pub async fn set_color_temperature(&self, kelvin: u32) -> Result<()> {
        self.set_color_temperature_unclamped(Kelvin::clamped(kelvin).kelvin())
            .await
    }

    /// Set the white color temperature without clamping it.
    pub async fn set_color_temperature_unclamped(&self, kelvin: u32) -> Result<()> {
        self.send(Command::color_temperature(kelvin)).await?;
        self.update_state(|state| {
            state.color_temperature = kelvin;
            state.last_changed = LastChanged::Temperature;
        });
        Ok(())
    }

    /// Set the color from channel values; each is clamped to `0..=255`.
    pub async fn set_color_rgb(&self, red: i64, green: i64, blue: i64) -> Result<()> {
        self.send_color(Color::clamped(red, green, blue)).await
    }

    /// Set the color from any color input, optionally setting the brightness too.
    ///
    /// Fails with [`Error::InvalidColor`] before sending anything when the
    /// input cannot be turned into a color.
    pub async fn set_color(&self, input: impl IntoColor, brightness: Option<i64>) -> Result<()> {
        let color = input.into_color()?;
        self.send_color(color).await?;
        if let Some(brightness) = brightness {
            self.set_brightness(brightness).await?;
        }
        Ok(())
    }

    async fn send_color(&self, color: Color) -> Result<()> {
        self.send(Command::color(color)).await?;
        self.update_state(|state| {
            state.color = color;
            state.last_changed = LastChanged::Color;
        });
        Ok(())
    }

    /// Fade from the current color to `to` in `steps` colors over `duration`.
    ///
    /// `steps` is clamped to `3..=100_000_000` and `duration` to
    /// 100 ms..=100 000 s. Dropping the returned future stops the fade after
    /// the last color sent.
    pub async fn fade_to_color(
        &self,
        to: impl IntoColor,
        steps: u64,
        duration: Duration,
    ) -> Result<()> {
        let from = self.color();
        self.fade_between(from, to, steps, duration).await
    }

    /// Like [`Device::fade_to_color`], starting from `from` instead of the
    /// current color.
    pub async fn fade_between(
        &self,
        from: impl IntoColor,
        to: impl IntoColor,
        steps: u64,
        duration: Duration,
    ) -> Result<()> {
        let to = to.into_color()?;
        let from = from.into_color()?;
        let steps = steps.clamp(MIN_STEPS, MAX_STEPS);
        let duration = duration.clamp(MIN_FADE_DURATION, MAX_FADE_DURATION);
        // `steps` fits in u32 after clamping
        let pause = duration / steps as u32;

        debug!(
            "fading {} from {from} to {to} in {steps} steps over {duration:?}",
            self.inner.id
        );
        for (i, color) in fade::fade(steps, from, to).enumerate() {
            if i > 0 {
                runtime::sleep(pause).await;
            }
            self.send_color(color).await?;
        }
        Ok(())
    }

    /// Send a single status request.
    pub async fn trigger_update(&self) -> Result<()> {
        self.send(Command::status_request()).await
    }

    /// Keep requesting the status every 50 ms until a reply arrives.
    ///
    /// Fails with [`Error::Destroyed`] if the registry is torn down first.
    /// Dropping the returned future stops the requests.
    pub async fn sync_now(&self) -> Result<()> {
        debug!("waiting for a status reply from {}", self.inner.id);
        let mut events = self.inner.events.subscribe();
        loop {
            self.trigger_update().await?;
            match runtime::timeout(SYNC_RETRY_INTERVAL, self.next_update(&mut events)).await {
                Ok(true) => return Ok(()),
                Ok(false) => return Err(Error::Destroyed),
                Err(_) => continue,
            }
        }
    }

    /// Wait until the first status reply has been applied.
    pub async fn wait_for_first_update(&self) -> Result<()> {
        let mut events = self.inner.events.subscribe();
        if self.is_synchronized() || self.next_update(&mut events).await {
            Ok(())
        } else {
            Err(Error::Destroyed)
        }
    }

    /// Wait for the next status reply for this device; false once the stream ends.
    async fn next_update(&self, events: &mut Events) -> bool {
        while let Some(event) = events.next().await {
            if let Event::DeviceGotUpdate { id } = &event {
                if *id == self.inner.id {
                    return true;
                }
            }
        }
        false
    }

    /// Start or stop the periodic status request heartbeat.
    ///
    /// Starting requests the status immediately. Send failures are reported
    /// as [`Event::Error`].
    pub fn set_auto_update(&self, on: bool) {
        let mut auto_update = self
            .inner
            .auto_update
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !on {
            *auto_update = None;
            return;
        }
        if auto_update.is_some() {
            return;
        }

        let inner = Arc::downgrade(&self.inner);
        *auto_update = Some(runtime::every(self.inner.update_interval, move || {
            let inner = inner.clone();
            async move {
                let Some(inner) = inner.upgrade() else {
                    return false;
                };
                let device = Device { inner };
                if let Err(err) = device.trigger_update().await {
                    warn!("status request to {} failed: {err}", device.inner.id);
                    device.inner.events.error(err);
                }
                true
            }
        }));
    }

    pub fn is_auto_updating(&self) -> bool {
        self.inner
            .auto_update
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop the heartbeat and release the transport.
    ///
    /// Every clone of the device is affected: later commands fail with
    /// [`Error::Destroyed`], while accessors keep returning the last state.
    pub fn destroy(&self) {
        self.set_auto_update(false);
        self.inner
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Record the address from a scan reply. Returns the previous address when it changed.
    pub(crate) fn update_from_scan(&self, scan: &ScanData) -> Option<Ipv4Addr> {
        let mut ip = self.inner.ip.lock().unwrap_or_else(PoisonError::into_inner);
        if *ip == scan.ip {
            return None;
        }
        let old = *ip;
        *ip = scan.ip;
        Some(old)
    }

    /// Merge a status reply and notify subscribers.
    pub(crate) fn apply_status(&self, report: &StatusReport) {
        let changed = {
            let mut state = self.lock_state();
            state.apply(report).then(|| state.clone())
        };

        debug!(
            "status from {}: {}",
            self.inner.id,
            if changed.is_some() { "changed" } else { "unchanged" }
        );
        if let Some(state) = changed {
            self.inner.events.emit(Event::DeviceStateChanged {
                id: self.inner.id.clone(),
                state,
            });
        }
        self.inner.events.emit(Event::DeviceGotUpdate {
            id: self.inner.id.clone(),
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::testing::{FailingTransport, RecordingTransport};

    pub(crate) fn scan_data(id: &str, ip: Ipv4Addr) -> ScanData {
        ScanData {
            ip,
            device: id.to_string(),
            sku: "H6159".to_string(),
            ble_version_hard: "3.01.01".to_string(),
            ble_version_soft: "1.03.01".to_string(),
            wifi_version_hard: "1.00.10".to_string(),
            wifi_version_soft: "1.02.03".to_string(),
        }
    }

    fn device(transport: Arc<dyn Transport>) -> (Device, Arc<EventBus>) {
        let events = EventBus::new();
        let scan = scan_data("AA:BB:CC", Ipv4Addr::new(192, 168, 1, 50));
        let device = Device::new(&scan, transport, Arc::clone(&events), Duration::from_secs(60));
        (device, events)
    }

    fn status(brightness: u8) -> StatusReport {
        StatusReport {
            on_off: 1,
            brightness,
            color: Color::rgb(255, 0, 0),
            color_tem_in_kelvin: None,
        }
    }

    #[test]
    fn test_identity_and_model() {
        let (device, _) = device(RecordingTransport::new());
        assert_eq!(device.id(), "AA:BB:CC");
        assert_eq!(device.model(), "H6159");
        assert!(device.supported());
        assert_eq!(device.name(), "Govee Smart LED Strip Lights");
        assert_eq!(device.versions().wifi_soft, "1.02.03");
        assert!(!device.is_synchronized());
    }

    #[tokio::test]
    async fn test_commands_update_state_optimistically() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());

        device.turn_on().await.unwrap();
        assert!(device.is_on());
        device.set_brightness(40).await.unwrap();
        assert_eq!(device.brightness(), 40);
        device.set_color("#102030", None).await.unwrap();
        assert_eq!(device.color(), Color::rgb(16, 32, 48));
        assert_eq!(device.last_changed(), LastChanged::Color);
        device.set_color_temperature(3000).await.unwrap();
        assert_eq!(device.color_temperature(), 3000);
        assert_eq!(device.last_changed(), LastChanged::Temperature);
        device.turn_off().await.unwrap();
        assert!(!device.is_on());

        let addr = transport::command_addr(Ipv4Addr::new(192, 168, 1, 50));
        let commands: Vec<String> = transport
            .commands()
            .into_iter()
            .map(|(to, cmd)| {
                assert_eq!(to, addr);
                cmd
            })
            .collect();
        assert_eq!(commands, ["turn", "brightness", "colorwc", "colorwc", "turn"]);
    }

    #[tokio::test]
    async fn test_clamping() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());

        device.set_brightness(150).await.unwrap();
        assert_eq!(device.brightness(), 100);
        device.set_brightness(-5).await.unwrap();
        assert_eq!(device.brightness(), 0);

        device.set_color_temperature(20_000).await.unwrap();
        assert_eq!(device.color_temperature(), 9000);
        device.set_color_temperature_unclamped(20_000).await.unwrap();
        assert_eq!(device.color_temperature(), 20_000);

        device.set_color_rgb(300, -1, 128).await.unwrap();
        assert_eq!(device.color(), Color::rgb(255, 0, 128));

        let sent = transport.sent();
        assert_eq!(sent[0].1["msg"]["data"]["value"], 100);
        assert_eq!(sent[1].1["msg"]["data"]["value"], 0);
        assert_eq!(sent[2].1["msg"]["data"]["colorTemInKelvin"], 9000);
    }

    #[tokio::test]
    async fn test_set_color_with_brightness() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());

        device.set_color((1u8, 2, 3), Some(55)).await.unwrap();
        assert_eq!(device.color(), Color::rgb(1, 2, 3));
        assert_eq!(device.brightness(), 55);
        assert_eq!(transport.count("colorwc"), 1);
        assert_eq!(transport.count("brightness"), 1);
    }

    #[tokio::test]
    async fn test_invalid_color_sends_nothing() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());

        let err = device.set_color("not a color", Some(50)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidColor(_)));
        let err = device
            .fade_between("#000", "nope", 10, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidColor(_)));
        let err = device
            .fade_between("nope", "#fff", 10, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidColor(_)));

        assert!(transport.sent().is_empty());
        assert_eq!(device.brightness(), 0);
    }

    #[tokio::test]
    async fn test_failed_send_leaves_state_untouched() {
        let (device, _) = device(Arc::new(FailingTransport));

        let err = device.set_brightness(80).await.unwrap_err();
        assert!(matches!(err, Error::Socket { ref action, .. } if action == "send"));
        assert_eq!(device.brightness(), 0);
        assert!(device.turn_on().await.is_err());
        assert!(!device.is_on());
    }

    #[tokio::test]
    async fn test_fade_sends_every_step() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());

        device
            .fade_to_color(Color::WHITE, 5, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(transport.count("colorwc"), 5);
        let sent = transport.sent();
        assert_eq!(sent[0].1["msg"]["data"]["color"]["r"], 0);
        assert_eq!(sent[4].1["msg"]["data"]["color"]["r"], 255);
        assert_eq!(device.color(), Color::WHITE);
    }

    #[tokio::test]
    async fn test_fade_clamps_steps() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());

        device
            .fade_between(Color::BLACK, Color::WHITE, 1, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(transport.count("colorwc"), 3);
    }

    #[tokio::test]
    async fn test_apply_status_events() {
        let (device, events) = device(RecordingTransport::new());
        let mut rx = events.subscribe();

        device.apply_status(&status(70));
        assert!(matches!(
            rx.next().await,
            Some(Event::DeviceStateChanged { ref state, .. }) if state.brightness.value() == 70
        ));
        assert!(matches!(rx.next().await, Some(Event::DeviceGotUpdate { .. })));
        assert!(device.is_synchronized());

        device.apply_status(&status(70));
        assert!(matches!(rx.next().await, Some(Event::DeviceGotUpdate { .. })));
    }

    #[tokio::test]
    async fn test_sync_now_resolves_after_status() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());

        let responder = device.clone();
        let reply = async move {
            runtime::sleep(Duration::from_millis(120)).await;
            responder.apply_status(&status(10));
        };
        let (synced, ()) = futures::join!(device.sync_now(), reply);

        synced.unwrap();
        assert_eq!(device.brightness(), 10);
        assert!(transport.count("devStatus") >= 2);
    }

    #[tokio::test]
    async fn test_sync_now_fails_when_destroyed() {
        let (device, events) = device(RecordingTransport::new());
        let closer = async {
            runtime::sleep(Duration::from_millis(20)).await;
            events.close(Event::Destroyed);
        };
        let (synced, ()) = futures::join!(device.sync_now(), closer);
        assert!(matches!(synced, Err(Error::Destroyed)));
    }

    #[tokio::test]
    async fn test_wait_for_first_update() {
        let (device, _) = device(RecordingTransport::new());
        let responder = device.clone();
        let reply = async move {
            runtime::sleep(Duration::from_millis(10)).await;
            responder.apply_status(&status(30));
        };
        let (waited, ()) = futures::join!(device.wait_for_first_update(), reply);
        waited.unwrap();

        // Already synchronized: resolves immediately
        device.wait_for_first_update().await.unwrap();
    }

    #[tokio::test]
    async fn test_auto_update_heartbeat() {
        let transport = RecordingTransport::new();
        let events = EventBus::new();
        let scan = scan_data("AA:BB:CC", Ipv4Addr::new(192, 168, 1, 50));
        let device = Device::new(&scan, transport.clone(), events, Duration::from_millis(20));

        device.set_auto_update(true);
        device.set_auto_update(true);
        assert!(device.is_auto_updating());
        runtime::sleep(Duration::from_millis(50)).await;
        device.destroy();
        assert!(!device.is_auto_updating());

        let requests = transport.count("devStatus");
        assert!((2..=4).contains(&requests), "saw {requests} requests");
        runtime::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.count("devStatus"), requests);
    }

    #[tokio::test]
    async fn test_auto_update_reports_send_failures() {
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let scan = scan_data("AA:BB:CC", Ipv4Addr::new(192, 168, 1, 50));
        let device = Device::new(
            &scan,
            Arc::new(FailingTransport),
            Arc::clone(&events),
            Duration::from_secs(60),
        );

        device.set_auto_update(true);
        assert!(matches!(rx.next().await, Some(Event::Error(_))));
        device.destroy();
    }

    #[tokio::test]
    async fn test_destroy_releases_transport() {
        let transport = RecordingTransport::new();
        let (device, _) = device(transport.clone());
        let kept = device.clone();
        device.set_brightness(30).await.unwrap();

        device.destroy();
        assert_eq!(Arc::strong_count(&transport), 1);
        assert!(matches!(kept.turn_on().await, Err(Error::Destroyed)));
        assert!(matches!(kept.sync_now().await, Err(Error::Destroyed)));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(kept.brightness(), 30);
    }

    #[test]
    fn test_update_from_scan() {
        let (device, _) = device(RecordingTransport::new());
        let same = scan_data("AA:BB:CC", Ipv4Addr::new(192, 168, 1, 50));
        assert_eq!(device.update_from_scan(&same), None);

        let moved = scan_data("AA:BB:CC", Ipv4Addr::new(192, 168, 1, 77));
        assert_eq!(
            device.update_from_scan(&moved),
            Some(Ipv4Addr::new(192, 168, 1, 50))
        );
        assert_eq!(device.ip(), Ipv4Addr::new(192, 168, 1, 77));
    }
}
