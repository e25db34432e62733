use std::fmt;

use thiserror::Error;

/// Operaciones del plano de control (para logging e inyección de fallos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ResourceGroupExists,
    CreateResourceGroup,
    CreateNetwork,
    CreateManagedEnvironment,
    CreateApplication,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ResourceGroupExists => "resource_group_exists",
            Operation::CreateResourceGroup => "create_or_get_resource_group",
            Operation::CreateNetwork => "create_or_get_network",
            Operation::CreateManagedEnvironment => "create_or_get_managed_environment",
            Operation::CreateApplication => "create_or_get_application",
        };
        f.write_str(name)
    }
}

/// Causa remota anidada (mensaje + causa interna opcional).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteCause {
    pub message: String,
    #[source]
    pub inner: Option<Box<RemoteCause>>,
}

impl RemoteCause {
    /// Cadena de causas de externa a interna.
    pub fn chain<I, S>(messages: I) -> Option<RemoteCause>
        where I: IntoIterator<Item = S>,
              I::IntoIter: DoubleEndedIterator,
              S: Into<String>
    {
        messages.into_iter().rev().fold(None, |inner, m| {
                                      Some(RemoteCause { message: m.into(),
                                                         inner: inner.map(Box::new) })
                                  })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProvisioningError {
    #[error("resource group '{0}' does not exist")]
    ResourceGroupMissing(String),
    #[error("{kind} '{name}' not found in resource group '{resource_group}'")]
    NotFound {
        kind: &'static str,
        name: String,
        resource_group: String,
    },
    #[error("{operation} failed for '{target}'")]
    Remote {
        operation: Operation,
        target: String,
        #[source]
        cause: RemoteCause,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn remote_errors_expose_the_full_chain() {
        let err = ProvisioningError::Remote { operation: Operation::CreateApplication,
                                              target: "db".into(),
                                              cause: RemoteCause::chain(["503 Service Unavailable", "quota exhausted"]).unwrap() };
        assert_eq!(err.to_string(), "create_or_get_application failed for 'db'");
        let first = err.source().unwrap();
        assert_eq!(first.to_string(), "503 Service Unavailable");
        assert_eq!(first.source().unwrap().to_string(), "quota exhausted");
        assert!(first.source().unwrap().source().is_none());
    }
}
