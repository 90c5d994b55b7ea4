// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use vici_duckling::vici::{
    model::IKEConf,
    wire::{OrderedMap, Value},
};

fn section(fields: Vec<(&str, Value)>) -> OrderedMap {
    let mut m = OrderedMap::new();
    for (k, v) in fields {
        m.push(k, v);
    }
    m
}

#[test]
fn decodes_sibling_auth_sections_by_prefix() {
    let mut conf_section = section(vec![
        ("version", Value::Str("2".to_string())),
        ("local_addrs", Value::List(vec!["10.0.0.1".to_string()])),
    ]);
    conf_section.push("local", Value::Section(section(vec![("class", Value::Str("psk".to_string()))])));
    conf_section.push("local-1", Value::Section(section(vec![("class", Value::Str("pubkey".to_string()))])));
    conf_section.push(
        "remote-eap",
        Value::Section(section(vec![
            ("eap-type", Value::Str("13".to_string())),
            ("eap-vendor", Value::Str("9048".to_string())),
            ("revocation", Value::Str("strict".to_string())),
        ])),
    );

    let mut children = OrderedMap::new();
    children.push("c1", Value::Section(section(vec![("mode", Value::Str("tunnel".to_string()))])));
    conf_section.push("children", Value::Section(children));

    let conf = IKEConf::from_section(&conf_section);

    assert_eq!(conf.ike_version.as_deref(), Some("2"));
    assert_eq!(conf.local_addrs, vec!["10.0.0.1".to_string()]);
    assert_eq!(conf.local_auth.len(), 2);
    assert_eq!(conf.remote_auth.len(), 1);
    let remote_eap = conf.remote_auth.get("remote-eap").expect("remote-eap section");
    assert_eq!(remote_eap.eap_type.as_deref(), Some("13"));
    assert_eq!(remote_eap.eap_vendor.as_deref(), Some("9048"));
    assert_eq!(remote_eap.revocation_policy.as_deref(), Some("strict"));
    assert_eq!(conf.children.len(), 1);
    assert_eq!(conf.children.get("c1").and_then(|c| c.mode.clone()), Some("tunnel".to_string()));
}

#[test]
fn duplicate_local_key_is_decoded_from_its_suffixed_name() {
    let mut m = OrderedMap::new();
    m.insert_dedup("local".to_string(), Value::Section(section(vec![("class", Value::Str("psk".to_string()))])));
    m.insert_dedup("local".to_string(), Value::Section(section(vec![("class", Value::Str("pubkey".to_string()))])));

    let conf = IKEConf::from_section(&m);
    assert_eq!(conf.local_auth.len(), 2);
    assert!(conf.local_auth.contains_key("local"));
    assert!(conf.local_auth.contains_key("local##0"));
}
