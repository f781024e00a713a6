//! Account record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::amount::Amount;
use crate::entity::Entity;
use crate::id::{AccountId, AccountIdentifier, SecurityCode};

/// A wallet account as stored.
///
/// The balance only changes through the ledger transaction processor. The
/// security code is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub identifier: AccountIdentifier,
    #[serde(skip_serializing)]
    pub security_code: SecurityCode,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_code_is_not_serialized() {
        let code = SecurityCode::generate().unwrap();
        let account = Account {
            id: AccountId::new(7),
            username: "alice.smith".to_string(),
            email: "alice@example.com".to_string(),
            identifier: AccountIdentifier::generate().unwrap(),
            security_code: code.clone(),
            balance: Amount::whole(10),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["balance"], "10.00");
        assert!(json.get("security_code").is_none());
        assert!(!json.to_string().contains(code.as_str()));
        assert_eq!(account.id(), &AccountId::new(7));
    }
}
