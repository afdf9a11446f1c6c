//! Dashboard tabs and role routing

use mdm_client::{AuthEvent, Role, View};

/// Tab not available to the current role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the {view} view is only available to super admins")]
pub struct Unavailable {
    /// Requested view
    pub view: View,
}

const MEMBER_TABS: [View; 4] = [View::Enterprise, View::Devices, View::Policies, View::Users];
const SUPER_ADMIN_TABS: [View; 5] = [
    View::Organizations,
    View::Enterprise,
    View::Devices,
    View::Policies,
    View::Users,
];

/// Tabs visible to a role and the active one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    role: Role,
    active: View,
}

impl Dashboard {
    /// Dashboard right after login
    #[must_use]
    pub fn for_role(role: &Role) -> Self {
        Self {
            role: role.clone(),
            active: role.landing_view(),
        }
    }

    /// Follow an auth event: login opens a dashboard, logout closes it
    #[must_use]
    pub fn on_event(event: &AuthEvent) -> Option<Self> {
        match event {
            AuthEvent::LoggedIn { role } => Some(Self::for_role(role)),
            AuthEvent::LoggedOut => None,
        }
    }

    /// Role the dashboard was built for
    #[inline]
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Tabs in display order
    #[must_use]
    pub fn tabs(&self) -> &'static [View] {
        if self.role.is_super_admin() {
            &SUPER_ADMIN_TABS
        } else {
            &MEMBER_TABS
        }
    }

    /// Active tab
    #[inline]
    #[must_use]
    pub fn active(&self) -> View {
        self.active
    }

    /// Switch tabs
    ///
    /// # Errors
    /// Returns `Unavailable` for tabs the role cannot see; the active tab
    /// is left unchanged
    pub fn select(&mut self, view: View) -> Result<View, Unavailable> {
        if !self.tabs().contains(&view) {
            return Err(Unavailable { view });
        }
        self.active = view;
        Ok(view)
    }

    /// One-line tab bar, active tab in brackets
    #[must_use]
    pub fn tab_bar(&self) -> String {
        self.tabs()
            .iter()
            .map(|&v| if v == self.active { format!("[{v}]") } else { v.to_string() })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_lands_on_organizations() {
        let dashboard = Dashboard::for_role(&Role::SuperAdmin);
        assert_eq!(dashboard.active(), View::Organizations);
        assert_eq!(dashboard.tabs().len(), 5);
        assert!(dashboard.tab_bar().starts_with("[Organizations]"));
    }

    #[test]
    fn member_cannot_open_organizations() {
        let mut dashboard = Dashboard::for_role(&Role::Member("ADMIN".into()));
        assert_eq!(dashboard.active(), View::Enterprise);
        assert_eq!(
            dashboard.select(View::Organizations),
            Err(Unavailable {
                view: View::Organizations
            })
        );
        assert_eq!(dashboard.active(), View::Enterprise);
        assert_eq!(dashboard.select(View::Policies), Ok(View::Policies));
        assert_eq!(dashboard.active(), View::Policies);
    }

    #[test]
    fn empty_role_is_member() {
        let dashboard = Dashboard::for_role(&Role::from_claim(""));
        assert!(!dashboard.tabs().contains(&View::Organizations));
    }

    #[test]
    fn events_open_and_close() {
        let opened = Dashboard::on_event(&AuthEvent::LoggedIn { role: Role::SuperAdmin }).unwrap();
        assert_eq!(opened.role(), &Role::SuperAdmin);
        assert_eq!(Dashboard::on_event(&AuthEvent::LoggedOut), None);
    }
}
