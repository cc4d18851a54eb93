//! Mock MetalsoftClient for unit testing
//!
//! In-memory provider that behaves like the Metalsoft API where it matters to
//! the controllers: creates reject duplicate labels with the same reference
//! codes and `ID <n>` text the real API uses, every infrastructure gets
//! `wan`/`lan`/`san` networks, and failures or latency can be injected per
//! operation.

use crate::error::MetalsoftError;
use crate::metalsoft_trait::MetalsoftClientTrait;
use crate::models::*;
use crate::ref_codes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Provider operations, used to inject failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    CreateInfrastructure,
    GetInfrastructure,
    ListNetworks,
    CreateSubnet,
    GetSubnet,
    CreateVariable,
    GetVariable,
}

impl MockOperation {
    fn is_create(self) -> bool {
        matches!(
            self,
            MockOperation::CreateInfrastructure | MockOperation::CreateSubnet | MockOperation::CreateVariable
        )
    }
}

struct MockState {
    infrastructures: HashMap<u64, Infrastructure>,
    networks: HashMap<u64, Networks>,
    subnets: HashMap<u64, Subnet>,
    variables: HashMap<u64, Variable>,
    next_infrastructure_id: u64,
    next_network_id: u64,
    next_subnet_id: u64,
    next_variable_id: u64,
    subnet_address: String,
    with_wan_network: bool,
    failures: HashMap<MockOperation, VecDeque<String>>,
    delays: HashMap<MockOperation, Duration>,
    calls: HashMap<MockOperation, usize>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            infrastructures: HashMap::new(),
            networks: HashMap::new(),
            subnets: HashMap::new(),
            variables: HashMap::new(),
            next_infrastructure_id: 1,
            next_network_id: 1,
            next_subnet_id: 1,
            next_variable_id: 1,
            subnet_address: "192.0.2.8".to_string(),
            with_wan_network: true,
            failures: HashMap::new(),
            delays: HashMap::new(),
            calls: HashMap::new(),
        }
    }
}

/// Mock MetalsoftClient for testing
///
/// Cloning shares the underlying state, so a test can keep a handle while the
/// code under test owns another.
#[derive(Clone, Default)]
pub struct MockMetalsoftClient {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockMetalsoftClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMetalsoftClient").finish_non_exhaustive()
    }
}

fn already_exists(kind: &str, label: &str, id: u64, ref_code: &str) -> MetalsoftError {
    MetalsoftError::Api {
        code: -32000,
        message: format!(
            "{} with label {} already exists (ID {}). Ref: {}",
            kind, label, id, ref_code
        ),
    }
}

impl MockMetalsoftClient {
    /// Create a new empty mock provider
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the ID given to the next created infrastructure.
    pub fn starting_infrastructure_id(self, id: u64) -> Self {
        self.state().next_infrastructure_id = id;
        self
    }

    /// Sets the ID given to the next created network (the `wan` network comes first).
    pub fn starting_network_id(self, id: u64) -> Self {
        self.state().next_network_id = id;
        self
    }

    /// Sets the ID given to the next created subnet.
    pub fn starting_subnet_id(self, id: u64) -> Self {
        self.state().next_subnet_id = id;
        self
    }

    /// Sets the ID given to the next created variable.
    pub fn starting_variable_id(self, id: u64) -> Self {
        self.state().next_variable_id = id;
        self
    }

    /// Address assigned to subnets created from now on. Empty means unallocated.
    pub fn with_subnet_address(self, address: impl Into<String>) -> Self {
        self.state().subnet_address = address.into();
        self
    }

    /// Infrastructures created from now on get no `wan` network.
    pub fn without_wan_network(self) -> Self {
        self.state().with_wan_network = false;
        self
    }

    /// Makes the next call of `operation` fail with an API error carrying `message`.
    pub fn fail_next(&self, operation: MockOperation, message: impl Into<String>) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(message.into());
    }

    /// Delays every call of `operation` by `delay`.
    pub fn delay(&self, operation: MockOperation, delay: Duration) {
        self.state().delays.insert(operation, delay);
    }

    /// Number of calls made to `operation`, successful or not.
    pub fn calls(&self, operation: MockOperation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Number of create calls of any kind.
    pub fn create_calls(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|(op, _)| op.is_create())
            .map(|(_, n)| n)
            .sum()
    }

    /// Adds an infrastructure as if it had been created out of band.
    pub fn insert_infrastructure(&self, label: &str, datacenter: &str) -> u64 {
        let mut state = self.state();
        Self::insert_infrastructure_locked(&mut state, label, datacenter)
    }

    /// Changes the address of an existing subnet.
    pub fn set_subnet_address(&self, subnet_id: u64, address: &str) {
        if let Some(subnet) = self.state().subnets.get_mut(&subnet_id) {
            subnet.subnet_range_start_human_readable = address.to_string();
        }
    }

    /// Snapshot of an infrastructure.
    pub fn infrastructure(&self, id: u64) -> Option<Infrastructure> {
        self.state().infrastructures.get(&id).cloned()
    }

    /// Snapshot of all infrastructures.
    pub fn infrastructures(&self) -> Vec<Infrastructure> {
        self.state().infrastructures.values().cloned().collect()
    }

    /// Snapshot of all subnets.
    pub fn subnets(&self) -> Vec<Subnet> {
        self.state().subnets.values().cloned().collect()
    }

    /// Looks up a variable by name.
    pub fn variable_by_name(&self, name: &str) -> Option<Variable> {
        self.state()
            .variables
            .values()
            .find(|v| v.variable_name == name)
            .cloned()
    }

    fn insert_infrastructure_locked(state: &mut MockState, label: &str, datacenter: &str) -> u64 {
        let id = state.next_infrastructure_id;
        state.next_infrastructure_id += 1;
        state.infrastructures.insert(
            id,
            Infrastructure {
                infrastructure_id: id,
                infrastructure_label: label.to_string(),
                datacenter_name: datacenter.to_string(),
                infrastructure_subdomain: Some(format!("{}.{}.metalsoft.test", label, datacenter)),
                user_id_owner: Some(1),
            },
        );

        let mut networks = Networks::new();
        let types: &[&str] = if state.with_wan_network { &["wan", "lan", "san"] } else { &["lan", "san"] };
        for network_type in types {
            let network_id = state.next_network_id;
            state.next_network_id += 1;
            networks.insert(
                network_type.to_string(),
                Network {
                    network_id,
                    network_type: network_type.to_string(),
                    network_label: Some(format!("{}-{}", network_type, id)),
                    infrastructure_id: id,
                },
            );
        }
        state.networks.insert(id, networks);
        id
    }

    /// Records the call, applies the configured delay and pops an injected failure.
    async fn enter(&self, operation: MockOperation) -> Result<(), MetalsoftError> {
        let delay = {
            let mut state = self.state();
            *state.calls.entry(operation).or_default() += 1;
            state.delays.get(&operation).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let injected = self
            .state()
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(message) => Err(MetalsoftError::Api { code: -32000, message }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl MetalsoftClientTrait for MockMetalsoftClient {
    fn endpoint(&self) -> &str {
        "https://mock.metalsoft.test/api/developer/developer"
    }

    async fn create_infrastructure(&self, request: &CreateInfrastructureRequest) -> Result<Infrastructure, MetalsoftError> {
        self.enter(MockOperation::CreateInfrastructure).await?;
        let mut state = self.state();
        if let Some(existing) = state
            .infrastructures
            .values()
            .find(|i| i.infrastructure_label == request.infrastructure_label)
        {
            return Err(already_exists(
                "Infrastructure",
                &request.infrastructure_label,
                existing.infrastructure_id,
                ref_codes::INFRASTRUCTURE_EXISTS,
            ));
        }
        let id = Self::insert_infrastructure_locked(&mut state, &request.infrastructure_label, &request.datacenter_name);
        state
            .infrastructures
            .get(&id)
            .cloned()
            .ok_or_else(|| MetalsoftError::NotFound(format!("Infrastructure {} not found", id)))
    }

    async fn get_infrastructure(&self, id: u64) -> Result<Infrastructure, MetalsoftError> {
        self.enter(MockOperation::GetInfrastructure).await?;
        self.state()
            .infrastructures
            .get(&id)
            .cloned()
            .ok_or_else(|| MetalsoftError::NotFound(format!("Infrastructure {} not found", id)))
    }

    async fn list_networks(&self, infrastructure_id: u64) -> Result<Networks, MetalsoftError> {
        self.enter(MockOperation::ListNetworks).await?;
        self.state()
            .networks
            .get(&infrastructure_id)
            .cloned()
            .ok_or_else(|| MetalsoftError::NotFound(format!("Infrastructure {} not found", infrastructure_id)))
    }

    async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<Subnet, MetalsoftError> {
        self.enter(MockOperation::CreateSubnet).await?;
        let mut state = self.state();
        if !state.infrastructures.contains_key(&request.infrastructure_id) {
            return Err(MetalsoftError::NotFound(format!(
                "Infrastructure {} not found",
                request.infrastructure_id
            )));
        }
        if let Some(existing) = state.subnets.values().find(|s| {
            s.infrastructure_id == request.infrastructure_id && s.subnet_label == request.subnet_label
        }) {
            return Err(already_exists(
                "Subnet",
                &request.subnet_label,
                existing.subnet_id,
                ref_codes::SUBNET_EXISTS,
            ));
        }

        let id = state.next_subnet_id;
        state.next_subnet_id += 1;
        let subnet = Subnet {
            subnet_id: id,
            network_id: request.network_id,
            infrastructure_id: request.infrastructure_id,
            subnet_label: request.subnet_label.clone(),
            subnet_destination: request.subnet_destination.clone(),
            subnet_prefix_size: request.subnet_prefix_size,
            subnet_type: request.subnet_type.clone(),
            subnet_automatic_allocation: request.subnet_automatic_allocation,
            subnet_range_start_human_readable: state.subnet_address.clone(),
            subnet_range_end_human_readable: String::new(),
            subnet_gateway_human_readable: None,
            subnet_subdomain: None,
        };
        state.subnets.insert(id, subnet.clone());
        Ok(subnet)
    }

    async fn get_subnet(&self, id: u64) -> Result<Subnet, MetalsoftError> {
        self.enter(MockOperation::GetSubnet).await?;
        self.state()
            .subnets
            .get(&id)
            .cloned()
            .ok_or_else(|| MetalsoftError::NotFound(format!("Subnet {} not found", id)))
    }

    async fn create_variable(&self, request: &CreateVariableRequest) -> Result<Variable, MetalsoftError> {
        self.enter(MockOperation::CreateVariable).await?;
        let mut state = self.state();
        if let Some(existing) = state
            .variables
            .values()
            .find(|v| v.variable_name == request.variable_name)
        {
            return Err(already_exists(
                "Variable",
                &request.variable_name,
                existing.variable_id,
                ref_codes::VARIABLE_EXISTS,
            ));
        }

        let id = state.next_variable_id;
        state.next_variable_id += 1;
        let variable = Variable {
            variable_id: id,
            variable_name: request.variable_name.clone(),
            variable_json: request.variable_json.clone(),
            variable_usage: None,
            user_id_owner: Some(1),
        };
        state.variables.insert(id, variable.clone());
        Ok(variable)
    }

    async fn get_variable(&self, id: u64) -> Result<Variable, MetalsoftError> {
        self.enter(MockOperation::GetVariable).await?;
        self.state()
            .variables
            .get(&id)
            .cloned()
            .ok_or_else(|| MetalsoftError::NotFound(format!("Variable {} not found", id)))
    }
}
