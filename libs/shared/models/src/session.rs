use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is calling the engine. Produced by the login collaborator from a
/// `user_account` row; the engine never keeps it between calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Session {
    Admin,
    Client { patient_id: Uuid },
}

impl Session {
    pub fn admin() -> Self {
        Session::Admin
    }

    pub fn client(patient_id: Uuid) -> Self {
        Session::Client { patient_id }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Session::Admin)
    }

    /// The patient this session is bound to, if any.
    pub fn bound_patient(&self) -> Option<Uuid> {
        match self {
            Session::Admin => None,
            Session::Client { patient_id } => Some(*patient_id),
        }
    }

    /// Whether this session may act on records of `patient_id`.
    pub fn can_act_for(&self, patient_id: Uuid) -> bool {
        match self {
            Session::Admin => true,
            Session::Client { patient_id: bound } => *bound == patient_id,
        }
    }
}
