use super::Port;
use crate::ApplicationId;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A read-only snapshot of which application is bound to each port of a
/// device. Later changes to the device are not visible through it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMap(Arc<FxHashMap<Port, ApplicationId>>);

impl PortMap {
    pub(crate) fn new(ports: FxHashMap<Port, ApplicationId>) -> Self {
        Self(Arc::new(ports))
    }

    pub fn get(&self, port: Port) -> Option<ApplicationId> {
        self.0.get(&port).copied()
    }

    pub fn contains_port(&self, port: Port) -> bool {
        self.0.contains_key(&port)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Port, ApplicationId)> + '_ {
        self.0.iter().map(|(port, application)| (*port, *application))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A read-only snapshot of the port each application on a device is bound
/// to. The exact inverse of the [`PortMap`] taken at the same moment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppMap(Arc<FxHashMap<ApplicationId, Port>>);

impl AppMap {
    pub(crate) fn new(applications: FxHashMap<ApplicationId, Port>) -> Self {
        Self(Arc::new(applications))
    }

    pub fn get(&self, application: ApplicationId) -> Option<Port> {
        self.0.get(&application).copied()
    }

    pub fn contains_application(&self, application: ApplicationId) -> bool {
        self.0.contains_key(&application)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ApplicationId, Port)> + '_ {
        self.0.iter().map(|(application, port)| (*application, *port))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
