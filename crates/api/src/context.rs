use ura_core::Account;

/// Authenticated account for a request.
///
/// Inserted by the authentication middleware; handlers behind it can rely on
/// it being present.
#[derive(Debug, Clone)]
pub struct AccountContext {
    account: Account,
}

impl AccountContext {
    pub fn new(account: Account) -> Self {
        Self { account }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}
