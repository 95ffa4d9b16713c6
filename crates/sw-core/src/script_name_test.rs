use super::*;

#[test]
fn test_script_name_display() {
    let name = ScriptName::new("0001_create_users.sql");
    assert_eq!(format!("{}", name), "0001_create_users.sql");
}

#[test]
fn test_script_name_try_new_rejects_empty() {
    assert!(ScriptName::try_new("").is_none());
    assert!(ScriptName::try_new("a.sql").is_some());
}

#[test]
fn test_script_name_equality() {
    let name = ScriptName::new("a.sql");
    assert_eq!(name, "a.sql");
    assert_eq!(name, "a.sql".to_string());
}

#[test]
fn test_script_name_orders_lexicographically() {
    let mut names = vec![
        ScriptName::new("010_b.sql"),
        ScriptName::new("002_a.sql"),
        ScriptName::new("010_a.sql"),
    ];
    names.sort();
    let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["002_a.sql", "010_a.sql", "010_b.sql"]);
}

#[test]
fn test_script_name_serializes_transparently() {
    let name = ScriptName::new("a.sql");
    let yaml = serde_yaml::to_string(&name).unwrap();
    assert_eq!(yaml.trim(), "a.sql");
}
