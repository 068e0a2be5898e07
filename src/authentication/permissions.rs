use crate::jwt::SessionData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Active,
    Inactive,
}

const ACTION_TABLE: &[(AccountState, &[ActionType])] = &[
    (
        AccountState::Active,
        &[
            ActionType::ManageOwnAccount,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnAttributes,
        ],
    ),
    (AccountState::Inactive, &[]),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    ManageOwnAccount,
    ManageOwnRecipes,
    ManageOwnAttributes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let state = session.account_state();

        ACTION_TABLE
            .iter()
            .find_map(|(account_state, actions)| {
                if *account_state != state {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(is_active: bool) -> SessionData {
        SessionData {
            user_id: 1,
            email: String::from("user@example.com"),
            name: String::from("User"),
            is_active,
        }
    }

    #[test]
    fn active_accounts_manage_their_data() {
        let session = session(true);
        assert!(ActionType::ManageOwnRecipes.authenticate(&session));
        assert!(ActionType::ManageOwnAttributes.authenticate(&session));
        assert!(ActionType::ManageOwnAccount.authenticate(&session));
    }

    #[test]
    fn inactive_accounts_can_do_nothing() {
        let session = session(false);
        assert!(!ActionType::ManageOwnRecipes.authenticate(&session));
        assert!(!ActionType::ManageOwnAccount.authenticate(&session));
        assert!(session.authenticate(ActionType::ManageOwnAttributes).is_err());
    }
}
