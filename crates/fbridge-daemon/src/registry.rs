//! Known devices and the current selection

use fbridge_core::Device;

/// Devices reported by the running daemon plus the user's selected id
///
/// Devices are kept in insertion order. The current device is never stored:
/// it is the selected device if it is present, otherwise the earliest
/// inserted device still present, otherwise none. Re-adding an id replaces
/// the entry in place and keeps its position.
///
/// The selected id is owned by the client and survives daemon restarts;
/// only `clear_devices` runs on restart.
#[derive(Debug, Default, Clone)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    selected_id: Option<String>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with a previously persisted selection
    pub fn with_selection(selected_id: Option<String>) -> Self {
        Self {
            devices: Vec::new(),
            selected_id,
        }
    }

    /// Add or replace a device. Returns whether the current device changed.
    pub fn insert(&mut self, device: Device) -> bool {
        self.track(|registry| {
            match registry.devices.iter_mut().find(|d| d.id == device.id) {
                Some(existing) => *existing = device,
                None => registry.devices.push(device),
            }
        })
    }

    /// Remove a device by id. Returns whether the current device changed.
    ///
    /// Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        self.track(|registry| registry.devices.retain(|d| d.id != id))
    }

    /// Record the user's choice. Returns whether the current device changed.
    ///
    /// The id does not have to be present; the selection takes effect as soon
    /// as a device with that id is added.
    pub fn select(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        self.track(|registry| registry.selected_id = Some(id))
    }

    /// Forget the selection. Returns whether the current device changed.
    pub fn clear_selection(&mut self) -> bool {
        self.track(|registry| registry.selected_id = None)
    }

    /// Drop every device but keep the selected id
    pub fn clear_devices(&mut self) -> bool {
        self.track(|registry| registry.devices.clear())
    }

    /// The derived current device
    pub fn current(&self) -> Option<&Device> {
        self.selected_id
            .as_deref()
            .and_then(|id| self.get(id))
            .or_else(|| self.devices.first())
    }

    pub fn get(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All devices in insertion order
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn track(&mut self, mutate: impl FnOnce(&mut Self)) -> bool {
        let before = self.current().cloned();
        mutate(self);
        self.current() != before.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> Device {
        Device::new(id, format!("Device {}", id), "android-arm64")
    }

    #[test]
    fn test_empty_registry_has_no_current() {
        let registry = DeviceRegistry::new();
        assert!(registry.current().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_first_insert_becomes_current() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.insert(device("d1")));
        assert!(!registry.insert(device("d2")));
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d1"));
    }

    #[test]
    fn test_removing_current_falls_back_to_earliest_remaining() {
        let mut registry = DeviceRegistry::new();
        registry.insert(device("d1"));
        registry.insert(device("d2"));
        registry.insert(device("d3"));

        assert!(registry.remove("d1"));
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d2"));

        assert!(!registry.remove("d3"));
        assert!(registry.remove("d2"));
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut registry = DeviceRegistry::new();
        registry.insert(device("d1"));
        assert!(!registry.remove("nope"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_selected_device_wins_when_present() {
        let mut registry = DeviceRegistry::new();
        registry.insert(device("d1"));
        registry.insert(device("d2"));

        assert!(registry.select("d2"));
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d2"));
    }

    #[test]
    fn test_selection_survives_removal_and_re_add() {
        let mut registry = DeviceRegistry::new();
        registry.insert(device("d1"));
        registry.insert(device("d2"));
        registry.select("d2");

        assert!(registry.remove("d2"));
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d1"));
        assert_eq!(registry.selected_id(), Some("d2"));

        assert!(registry.insert(device("d2")));
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d2"));
    }

    #[test]
    fn test_select_absent_device_keeps_fallback() {
        let mut registry = DeviceRegistry::new();
        registry.insert(device("d1"));
        assert!(!registry.select("ghost"));
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d1"));
        assert_eq!(registry.selected_id(), Some("ghost"));
    }

    #[test]
    fn test_re_add_replaces_in_place() {
        let mut registry = DeviceRegistry::new();
        registry.insert(device("d1"));
        registry.insert(device("d2"));

        let renamed = Device::new("d1", "Renamed", "android-arm64");
        assert!(registry.insert(renamed.clone()));
        assert_eq!(registry.devices()[0], renamed);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_clear_devices_keeps_selection() {
        let mut registry = DeviceRegistry::with_selection(Some("d2".to_string()));
        registry.insert(device("d1"));
        registry.insert(device("d2"));
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d2"));

        assert!(registry.clear_devices());
        assert!(registry.current().is_none());
        assert_eq!(registry.selected_id(), Some("d2"));
    }

    #[test]
    fn test_clear_selection_reverts_to_first() {
        let mut registry = DeviceRegistry::new();
        registry.insert(device("d1"));
        registry.insert(device("d2"));
        registry.select("d2");

        assert!(registry.clear_selection());
        assert_eq!(registry.current().map(|d| d.id.as_str()), Some("d1"));
    }
}
