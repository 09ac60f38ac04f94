//! Arena of wires allocated while a circuit is being defined.

use serde::{Deserialize, Serialize};

use crate::Variable;

/// How a wire receives its value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VariableRole {
    Public,
    Secret,
    Internal,
}

impl VariableRole {
    pub(crate) fn tag(self) -> u8 {
        match self {
            VariableRole::Public => 0,
            VariableRole::Secret => 1,
            VariableRole::Internal => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(VariableRole::Public),
            1 => Some(VariableRole::Secret),
            2 => Some(VariableRole::Internal),
            _ => None,
        }
    }
}

/// Owns every variable of a compilation. Ids are handed out densely in
/// allocation order and a role never changes once assigned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableStore {
    roles: Vec<VariableRole>,
    public: Vec<(Variable, String)>,
    secret: Vec<(Variable, String)>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, role: VariableRole) -> Variable {
        let var = Variable(self.roles.len());
        self.roles.push(role);
        var
    }

    /// Allocates an input wire and records it in declaration order.
    pub fn allocate_input(&mut self, role: VariableRole, name: String) -> Variable {
        let var = self.allocate(role);
        match role {
            VariableRole::Public => self.public.push((var, name)),
            VariableRole::Secret => self.secret.push((var, name)),
            VariableRole::Internal => {}
        }
        var
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn role(&self, var: Variable) -> VariableRole {
        self.roles[var.0]
    }

    pub fn roles(&self) -> &[VariableRole] {
        &self.roles
    }

    pub fn public_inputs(&self) -> &[(Variable, String)] {
        &self.public
    }

    pub fn secret_inputs(&self) -> &[(Variable, String)] {
        &self.secret
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<VariableRole>,
        Vec<(Variable, String)>,
        Vec<(Variable, String)>,
    ) {
        (self.roles, self.public, self.secret)
    }
}
