use serde::{Deserialize, Serialize};

/// An authenticated account, as produced by the credential check.
///
/// The wizard only ever sees a verified account; `id` keys the session
/// registry and the per-principal staging/artifact directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilizador {
    pub id: String,
    pub nome: String,
    pub email: String,
}

/// Credential verification, delegated to the hosting application.
///
/// Password storage and hashing are not the wizard's concern; implementors
/// return the account when the pair is valid and `None` otherwise.
pub trait CredentialCheck: Send + Sync {
    fn verify(&self, email: &str, senha: &str) -> Option<Utilizador>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SingleUser(Utilizador);

    impl CredentialCheck for SingleUser {
        fn verify(&self, email: &str, senha: &str) -> Option<Utilizador> {
            (email == self.0.email && senha == "correta").then(|| self.0.clone())
        }
    }

    #[test]
    fn test_verify_gates_on_both_fields() {
        let checker = SingleUser(Utilizador {
            id: "u1".to_string(),
            nome: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        });

        assert!(checker.verify("ana@example.com", "correta").is_some());
        assert!(checker.verify("ana@example.com", "errada").is_none());
        assert!(checker.verify("outra@example.com", "correta").is_none());
    }
}
