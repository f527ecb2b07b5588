//! Connection registry
//!
//! Tracks which connection currently holds the `mobile` and `pc` roles. Each
//! role has at most one holder and each connection holds at most one role.
//! Because the holder is remembered, a disconnect clears exactly the role the
//! departing connection held.

use parking_lot::Mutex;

use crate::protocol::{ConnectionId, DeviceStatus, Role};

#[derive(Debug, Default)]
struct RoleSlots {
    mobile: Option<ConnectionId>,
    pc: Option<ConnectionId>,
}

impl RoleSlots {
    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Mobile => &mut self.mobile,
            Role::Pc => &mut self.pc,
        }
    }

    fn slot(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Mobile => self.mobile,
            Role::Pc => self.pc,
        }
    }

    fn role_of(&self, id: ConnectionId) -> Option<Role> {
        if self.mobile == Some(id) {
            Some(Role::Mobile)
        } else if self.pc == Some(id) {
            Some(Role::Pc)
        } else {
            None
        }
    }

    fn status(&self) -> DeviceStatus {
        DeviceStatus {
            mobile_connected: self.mobile.is_some(),
            pc_connected: self.pc.is_some(),
        }
    }
}

/// Outcome of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Status after the change, ready to broadcast
    pub status: DeviceStatus,
    /// Previous holder of the role, now unregistered
    pub displaced: Option<ConnectionId>,
    /// Role the registering connection gave up to take the new one
    pub released: Option<Role>,
}

/// Role attachment table shared by all connection handlers
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    slots: Mutex<RoleSlots>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `role` as attached through connection `id`
    pub fn set_connected(&self, role: Role, id: ConnectionId) -> Registration {
        self.set_connected_and(role, id, |_| {})
    }

    /// Like [`set_connected`](Self::set_connected), running `notify` before
    /// the lock is released
    ///
    /// Status events enqueued from `notify` therefore leave in the order the
    /// changes were applied. `notify` must not block or touch the registry.
    pub fn set_connected_and<F>(&self, role: Role, id: ConnectionId, notify: F) -> Registration
    where
        F: FnOnce(&Registration),
    {
        let mut slots = self.slots.lock();

        let released = match slots.role_of(id) {
            Some(current) if current != role => {
                *slots.slot_mut(current) = None;
                Some(current)
            }
            _ => None,
        };

        let displaced = slots.slot_mut(role).replace(id).filter(|prev| *prev != id);

        let registration = Registration {
            status: slots.status(),
            displaced,
            released,
        };
        notify(&registration);
        registration
    }

    /// Clear whatever role `id` holds
    ///
    /// Returns the cleared role, or `None` if the connection held nothing.
    pub fn release(&self, id: ConnectionId) -> Option<Role> {
        self.release_and(id, |_, _| {})
    }

    /// Like [`release`](Self::release), running `notify` with the cleared
    /// role and the resulting status before the lock is released
    pub fn release_and<F>(&self, id: ConnectionId, notify: F) -> Option<Role>
    where
        F: FnOnce(Option<Role>, DeviceStatus),
    {
        let mut slots = self.slots.lock();
        let role = slots.role_of(id);
        if let Some(role) = role {
            *slots.slot_mut(role) = None;
        }
        notify(role, slots.status());
        role
    }

    /// Current attachment pair
    pub fn get_status(&self) -> DeviceStatus {
        self.slots.lock().status()
    }

    pub fn role_of(&self, id: ConnectionId) -> Option<Role> {
        self.slots.lock().role_of(id)
    }

    /// Connection currently holding `role`
    pub fn holder(&self, role: Role) -> Option<ConnectionId> {
        self.slots.lock().slot(role)
    }

    pub fn is_connected(&self, role: Role) -> bool {
        self.holder(role).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_mobile_only() {
        let registry = ConnectionRegistry::new();
        let phone = ConnectionId::new();

        let reg = registry.set_connected(Role::Mobile, phone);
        assert_eq!(
            reg.status,
            DeviceStatus {
                mobile_connected: true,
                pc_connected: false,
            }
        );
        assert_eq!(registry.get_status(), reg.status);
        assert_eq!(registry.role_of(phone), Some(Role::Mobile));
        assert_eq!(reg.displaced, None);
        assert_eq!(reg.released, None);
    }

    #[test]
    fn test_release_clears_only_own_role() {
        let registry = ConnectionRegistry::new();
        let phone = ConnectionId::new();
        let desktop = ConnectionId::new();
        let viewer = ConnectionId::new();

        registry.set_connected(Role::Mobile, phone);
        registry.set_connected(Role::Pc, desktop);

        assert_eq!(registry.release(viewer), None);
        assert_eq!(registry.release(desktop), Some(Role::Pc));
        assert_eq!(
            registry.get_status(),
            DeviceStatus {
                mobile_connected: true,
                pc_connected: false,
            }
        );
        assert_eq!(registry.release(desktop), None);
    }

    #[test]
    fn test_later_registration_takes_over() {
        let registry = ConnectionRegistry::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        registry.set_connected(Role::Pc, first);
        let reg = registry.set_connected(Role::Pc, second);
        assert_eq!(reg.displaced, Some(first));
        assert_eq!(registry.holder(Role::Pc), Some(second));
        assert_eq!(registry.role_of(first), None);

        // The displaced connection leaving must not clear the new holder
        assert_eq!(registry.release(first), None);
        assert!(registry.is_connected(Role::Pc));
    }

    #[test]
    fn test_notify_sees_applied_change() {
        let registry = ConnectionRegistry::new();
        let phone = ConnectionId::new();
        let mut seen = None;

        registry.set_connected_and(Role::Mobile, phone, |reg| seen = Some(reg.status));
        assert_eq!(
            seen,
            Some(DeviceStatus {
                mobile_connected: true,
                pc_connected: false,
            })
        );

        let mut released = None;
        registry.release_and(phone, |role, status| released = Some((role, status)));
        assert_eq!(released, Some((Some(Role::Mobile), DeviceStatus::default())));

        // Unregistered connections still get a callback
        let mut called = false;
        assert_eq!(registry.release_and(phone, |role, _| called = role.is_none()), None);
        assert!(called);
    }

    #[test]
    fn test_switching_roles_releases_previous() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();

        registry.set_connected(Role::Mobile, id);
        let reg = registry.set_connected(Role::Pc, id);
        assert_eq!(reg.released, Some(Role::Mobile));
        assert_eq!(
            reg.status,
            DeviceStatus {
                mobile_connected: false,
                pc_connected: true,
            }
        );

        let again = registry.set_connected(Role::Pc, id);
        assert_eq!(again.displaced, None);
        assert_eq!(again.released, None);
    }
}
