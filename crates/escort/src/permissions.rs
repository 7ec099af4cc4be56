/// Authorization to use location and messaging. The prompt itself lives
/// outside the core; journeys only ask for the verdict.
pub trait PermissionGate: Send + Sync {
    fn granted(&self) -> bool;
}

/// A fixed verdict, configured once at startup.
#[derive(Debug, Clone)]
pub struct StaticPermissionGate {
    granted: bool,
}

impl StaticPermissionGate {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }

    pub fn allowed() -> Self {
        Self::new(true)
    }

    pub fn denied() -> Self {
        Self::new(false)
    }
}

impl PermissionGate for StaticPermissionGate {
    fn granted(&self) -> bool {
        self.granted
    }
}
