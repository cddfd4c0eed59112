//! Deterministic Nagios object-definition rendering.
//!
//! Output order is fixed by the renderer alone: hosts by ascending name,
//! attributes by ascending key, dependencies by ascending remote name.
//! Services keep the order of the OS check rules that produced them.

use std::fmt::Write as _;

use super::model::{DesiredState, Host};

/// First lines of every generated file.
pub const HEADER: &str = "# This config is dynamically generated. Do not edit. Your changes will be lost.\n\
# This config is generated by nagsync\n";

/// Rendered file contents. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    text: String,
}

impl RenderedConfig {
    /// The file contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The file contents as written to disk.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Never true for a rendered file, which always carries the header.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Render the whole model.
#[must_use]
pub fn render(state: &DesiredState) -> RenderedConfig {
    let mut hosts: Vec<&Host> = state.hosts().collect();
    hosts.sort_by(|left, right| left.hostname.cmp(&right.hostname));

    let mut out = String::from(HEADER);
    for host in hosts {
        render_host(&mut out, host, state.dependency_tracking());
    }
    RenderedConfig { text: out }
}

fn render_host(out: &mut String, host: &Host, dependency_tracking: bool) {
    let mut attrs = host.attributes();
    attrs.sort_by_key(|(key, _)| *key);
    write_block(
        out,
        "host",
        &host.hostname,
        attrs.iter().map(|(key, value)| (*key, value.as_str())),
    );

    for service in &host.services {
        let mut attrs = service.attributes();
        attrs.sort_by_key(|(key, _)| *key);
        write_block(out, "service", &host.hostname, attrs.into_iter());
    }

    if dependency_tracking {
        let mut remotes: Vec<&String> = host.dependencies.iter().collect();
        remotes.sort();
        for remote in remotes {
            write_block(
                out,
                "hostdependency",
                &host.hostname,
                [
                    ("dependent_host_name", remote.as_str()),
                    ("inherits_parent", "0"),
                    ("notification_failure_criteria", "d,u"),
                ]
                .into_iter(),
            );
        }
    }
}

fn write_block<'v>(
    out: &mut String,
    kind: &str,
    hostname: &str,
    attrs: impl Iterator<Item = (&'static str, &'v str)>,
) {
    let _ = writeln!(out, "define {kind} {{");
    let _ = writeln!(out, "  host_name {hostname}");
    for (key, value) in attrs {
        let _ = writeln!(out, "  {key} {value}");
    }
    out.push_str("}\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::model::fixtures::{host, service};
    use proptest::prelude::*;

    fn sample_hosts() -> Vec<Host> {
        let mut router = host("router-a", 1);
        router.services.push(service("check-cpu"));
        let mut command = service("check-if");
        command.check_command = Some("check-if!pub".to_string());
        router.services.push(command);
        router.dependencies.insert("switch-b".to_string());
        router.dependencies.insert("access-c".to_string());

        let mut switch = host("switch-b", 2);
        switch.services.push(service("check-cpu"));
        vec![router, switch, host("access-c", 3)]
    }

    fn state_from(hosts: impl IntoIterator<Item = Host>, tracking: bool) -> DesiredState {
        let mut state = DesiredState::new(tracking);
        for host in hosts {
            state.insert_host(host);
        }
        state
    }

    #[test]
    fn empty_model_renders_header_only() {
        let rendered = render(&DesiredState::new(true));
        assert_eq!(rendered.as_str(), HEADER);
    }

    #[test]
    fn host_block_has_sorted_attributes_and_no_bookkeeping() {
        let rendered = render(&state_from([host("router-a", 1)], true));
        let expected = format!(
            "{HEADER}define host {{\n  host_name router-a\n  address 10.0.0.1\n  notes_url https://observium.example.com/device/device=1/\n  use observium-host\n}}\n\n"
        );
        assert_eq!(rendered.as_str(), expected);
        assert!(!rendered.as_str().contains("services"));
        assert!(!rendered.as_str().contains("dependencies"));
    }

    #[test]
    fn blocks_are_grouped_per_host_in_order() {
        let rendered = render(&state_from(sample_hosts(), true));
        let text = rendered.as_str();

        let access = text.find("host_name access-c").unwrap();
        let router = text.find("host_name router-a").unwrap();
        let switch = text.find("define host {\n  host_name switch-b").unwrap();
        assert!(access < router && router < switch);

        let router_section = &text[router..switch];
        let cpu = router_section.find("use check-cpu").unwrap();
        let iface = router_section.find("check_command check-if!pub").unwrap();
        let dep_access = router_section.find("dependent_host_name access-c").unwrap();
        let dep_switch = router_section.find("dependent_host_name switch-b").unwrap();
        assert!(cpu < iface && iface < dep_access && dep_access < dep_switch);

        assert!(text.contains(
            "define hostdependency {\n  host_name router-a\n  dependent_host_name switch-b\n  inherits_parent 0\n  notification_failure_criteria d,u\n}\n\n"
        ));
    }

    #[test]
    fn service_attributes_are_sorted() {
        let rendered = render(&state_from(sample_hosts(), false));
        assert!(rendered.as_str().contains(
            "define service {\n  host_name router-a\n  check_command check-if!pub\n  notes_url https://observium.example.com/device/device=1/\n  use check-if\n}\n\n"
        ));
    }

    #[test]
    fn dependencies_are_omitted_when_tracking_is_off() {
        let rendered = render(&state_from(sample_hosts(), false));
        assert!(!rendered.as_str().contains("hostdependency"));
    }

    fn arb_hosts() -> impl Strategy<Value = Vec<Host>> {
        prop::collection::btree_map(
            "[a-z][a-z0-9.-]{0,15}",
            (
                any::<u8>(),
                prop::collection::vec(("[a-z][a-z0-9-]{0,12}", any::<bool>()), 0..4),
            ),
            0..8,
        )
        .prop_map(|hosts| {
            hosts
                .into_iter()
                .map(|(name, (octet, checks))| {
                    let mut entry = host(&name, octet);
                    for (check, community) in checks {
                        let mut check_entry = service(&check);
                        if community {
                            check_entry.check_command = Some(format!("{check}!pub"));
                        }
                        entry.services.push(check_entry);
                    }
                    entry
                })
                .collect()
        })
    }

    fn state_with_edges<'e>(
        hosts: Vec<Host>,
        edges: impl Iterator<Item = &'e (String, String)>,
        tracking: bool,
    ) -> DesiredState {
        let mut state = state_from(hosts, tracking);
        for (hostname, remote) in edges {
            state.add_dependency(hostname, remote);
        }
        state
    }

    proptest! {
        #[test]
        fn output_is_independent_of_insertion_order(
            (hosts, shuffled) in arb_hosts()
                .prop_flat_map(|hosts| (Just(hosts.clone()), Just(hosts).prop_shuffle())),
            picks in prop::collection::vec(
                (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
                0..16,
            ),
            tracking in any::<bool>(),
        ) {
            let names: Vec<&str> = hosts.iter().map(|h| h.hostname.as_str()).collect();
            let edges: Vec<(String, String)> = if names.is_empty() {
                Vec::new()
            } else {
                picks
                    .iter()
                    .map(|(from, to)| {
                        (
                            names[from.index(names.len())].to_string(),
                            names[to.index(names.len())].to_string(),
                        )
                    })
                    .collect()
            };

            let forward = render(&state_with_edges(hosts.clone(), edges.iter(), tracking));
            let backward = render(&state_with_edges(shuffled, edges.iter().rev(), tracking));
            prop_assert_eq!(forward.as_bytes(), backward.as_bytes());
            prop_assert!(forward.as_str().starts_with(HEADER));
            for name in &names {
                let needle = format!("define host {{\n  host_name {name}\n");
                prop_assert!(forward.as_str().contains(&needle));
            }
        }
    }
}
