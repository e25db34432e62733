//! Nombres de recursos derivados del tenant y reglas de nombre del resource
//! group.

pub const DEFAULT_REGION: &str = "JapanEast";

pub const VNET_ADDRESS_SPACE: &str = "10.0.0.0/16";
pub const SUBNET_PREFIX: &str = "10.0.0.0/23";

const MAX_RESOURCE_GROUP_LEN: usize = 90;

pub fn vnet_name(resource_group: &str) -> String {
    format!("{resource_group}-VNet")
}

pub fn subnet_name(resource_group: &str) -> String {
    format!("{resource_group}-Subnet")
}

pub fn environment_name(resource_group: &str) -> String {
    format!("{resource_group}-ContainerAppEnv")
}

/// Reglas del backend para nombres de resource group: 1–90 caracteres de
/// letras, dígitos, `_`, `-`, `.`, `(`, `)`, sin terminar en `.`.
pub fn check_resource_group_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("tenant identifier cannot be empty".into());
    }
    if name.chars().count() > MAX_RESOURCE_GROUP_LEN {
        return Err(format!("tenant identifier exceeds {MAX_RESOURCE_GROUP_LEN} characters"));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')'))) {
        return Err(format!("tenant identifier contains invalid character '{bad}'"));
    }
    if name.ends_with('.') {
        return Err("tenant identifier cannot end with '.'".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names() {
        assert_eq!(vnet_name("acme"), "acme-VNet");
        assert_eq!(subnet_name("acme"), "acme-Subnet");
        assert_eq!(environment_name("acme"), "acme-ContainerAppEnv");
    }

    #[test]
    fn resource_group_rules() {
        assert!(check_resource_group_name("acme").is_ok());
        assert!(check_resource_group_name("team_a-1.(dev)").is_ok());
        assert!(check_resource_group_name("").is_err());
        assert!(check_resource_group_name("acme.").is_err());
        assert!(check_resource_group_name("ac me").is_err());
        assert!(check_resource_group_name("a/b").is_err());
        assert!(check_resource_group_name(&"x".repeat(90)).is_ok());
        assert!(check_resource_group_name(&"x".repeat(91)).is_err());
    }
}
