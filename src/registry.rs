use serde::{Deserialize, Serialize};

/// Operational status of a machine on the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Active,
    Waiting,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,
    pub name: String,
    pub status: MachineStatus,
}

impl Machine {
    pub fn new(id: &str, name: &str, status: MachineStatus) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status,
        }
    }
}

/// Read-only machine list consumed by the simulator and detector loops.
/// Only `active` machines participate in either.
#[derive(Debug, Clone)]
pub struct MachineRegistry {
    machines: Vec<Machine>,
}

impl MachineRegistry {
    pub fn new(machines: Vec<Machine>) -> Self {
        Self { machines }
    }

    /// Built-in plant layout used when the config file does not list machines.
    pub fn default_floor() -> Self {
        use MachineStatus::{Active, Inactive, Waiting};
        let machines = vec![
            Machine::new("m1", "M1", Active),
            Machine::new("m2", "M2", Active),
            Machine::new("m3", "M3", Inactive),
            Machine::new("m4", "M4", Waiting),
            Machine::new("m5", "M5", Active),
            Machine::new("m6", "M6", Active),
            Machine::new("m7", "M7", Active),
            Machine::new("m8", "M8", Inactive),
            Machine::new("m11", "M11", Waiting),
            Machine::new("m12", "M12", Waiting),
            Machine::new("m13", "M13", Active),
            Machine::new("m14", "M14", Inactive),
            Machine::new("m15", "M15", Active),
            Machine::new("m16", "M16", Waiting),
            Machine::new("m17", "M17", Inactive),
            Machine::new("m18", "M18", Active),
            Machine::new("m19", "M19", Active),
            Machine::new("m20", "M20", Active),
            Machine::new("m21", "M21", Waiting),
            Machine::new("m22", "M22", Active),
        ];
        Self { machines }
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn active(&self) -> impl Iterator<Item = &Machine> {
        self.machines
            .iter()
            .filter(|m| m.status == MachineStatus::Active)
    }

    pub fn get(&self, id: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }
}

impl Default for MachineRegistry {
    fn default() -> Self {
        Self::default_floor()
    }
}
