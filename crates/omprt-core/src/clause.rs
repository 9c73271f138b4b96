//! Directive and clause descriptors
//!
//! Structured form of what a front-end extracts from directive text. The
//! runtime never parses whole directives; `Clause` accepts the textual
//! shape of a single clause (`reduction(+:acc)`) for front-ends that hand
//! over clause strings, everything else arrives already typed.

use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;
use crate::op::ReductionOp;
use crate::schedule::Schedule;

/// Constructs the runtime implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Parallel,
    For,
    ParallelFor,
    Critical,
    Single,
    Barrier,
}

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Parallel => "parallel",
            Directive::For => "for",
            Directive::ParallelFor => "parallel for",
            Directive::Critical => "critical",
            Directive::Single => "single",
            Directive::Barrier => "barrier",
        }
    }

    /// Whether `clause` may appear on this directive
    pub fn allows(&self, clause: &Clause) -> bool {
        use Directive::*;
        match clause {
            Clause::Private(_) => matches!(self, Critical | For | Parallel | ParallelFor | Single),
            Clause::Reduction { .. } | Clause::Collapse { .. } | Clause::Schedule(_) => {
                matches!(self, For | ParallelFor)
            }
            Clause::NoWait => matches!(self, For | Single),
            Clause::NumThreads(_) => matches!(self, Parallel | ParallelFor),
        }
    }

    /// Check every clause against this directive and validate payloads
    pub fn validate(&self, clauses: &[Clause]) -> Result<(), ConfigError> {
        for clause in clauses {
            if !self.allows(clause) {
                return Err(ConfigError::ClauseNotAllowed {
                    clause: clause.name(),
                    directive: self.name(),
                });
            }
            clause.validate()?;
        }
        Ok(())
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One clause with its typed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Variables privatized by the front-end; recorded, not acted on
    Private(Vec<String>),
    Reduction { var: String, op: ReductionOp },
    Collapse { var: String, op: ReductionOp },
    Schedule(Schedule),
    NoWait,
    NumThreads(usize),
}

impl Clause {
    pub fn name(&self) -> &'static str {
        match self {
            Clause::Private(_) => "private",
            Clause::Reduction { .. } => "reduction",
            Clause::Collapse { .. } => "collapse",
            Clause::Schedule(_) => "schedule",
            Clause::NoWait => "nowait",
            Clause::NumThreads(_) => "num_threads",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Clause::Schedule(s) => s.validate(),
            Clause::NumThreads(0) => Err(ConfigError::ZeroTeamSize),
            Clause::Reduction { var, .. } | Clause::Collapse { var, .. } if var.is_empty() => {
                Err(ConfigError::MalformedClause(self.to_string()))
            }
            Clause::Private(vars) if vars.iter().any(|v| v.is_empty()) => {
                Err(ConfigError::MalformedClause(self.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Private(vars) => write!(f, "private({})", vars.join(", ")),
            Clause::Reduction { var, op } => write!(f, "reduction({}:{})", op, var),
            Clause::Collapse { var, op } => write!(f, "collapse({}:{})", op, var),
            Clause::Schedule(s) => write!(f, "schedule({})", s),
            Clause::NoWait => f.write_str("nowait"),
            Clause::NumThreads(n) => write!(f, "num_threads({})", n),
        }
    }
}

/// Split `name(args)` into its parts; bare `name` yields no args
fn split_call(text: &str) -> Result<(&str, Option<&str>), ConfigError> {
    let malformed = || ConfigError::MalformedClause(text.to_string());
    match text.find('(') {
        None => Ok((text, None)),
        Some(open) => {
            let args = text[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
            Ok((text[..open].trim(), Some(args)))
        }
    }
}

/// `op:var` of reduction and collapse
fn parse_op_var(text: &str, args: &str) -> Result<(String, ReductionOp), ConfigError> {
    let (op, var) = args
        .split_once(':')
        .ok_or_else(|| ConfigError::MalformedClause(text.to_string()))?;
    let var = var.trim();
    if var.is_empty() {
        return Err(ConfigError::MalformedClause(text.to_string()));
    }
    Ok((var.to_string(), op.parse()?))
}

impl FromStr for Clause {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let malformed = || ConfigError::MalformedClause(text.to_string());
        let clause = match split_call(text)? {
            ("nowait", None) => Clause::NoWait,
            ("private", Some(args)) => {
                Clause::Private(args.split(',').map(|v| v.trim().to_string()).collect())
            }
            ("reduction", Some(args)) => {
                let (var, op) = parse_op_var(text, args)?;
                Clause::Reduction { var, op }
            }
            ("collapse", Some(args)) => {
                let (var, op) = parse_op_var(text, args)?;
                Clause::Collapse { var, op }
            }
            ("schedule", Some(args)) => Clause::Schedule(args.parse()?),
            ("num_threads", Some(args)) => {
                Clause::NumThreads(args.trim().parse().map_err(|_| malformed())?)
            }
            _ => return Err(malformed()),
        };
        clause.validate()?;
        Ok(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduleKind;

    #[test]
    fn test_parse_clauses() {
        assert_eq!(
            "reduction(+:acc)".parse::<Clause>().unwrap(),
            Clause::Reduction { var: "acc".to_string(), op: ReductionOp::Add }
        );
        assert_eq!(
            "collapse(*: prod)".parse::<Clause>().unwrap(),
            Clause::Collapse { var: "prod".to_string(), op: ReductionOp::Mul }
        );
        assert_eq!(
            "schedule(static)".parse::<Clause>().unwrap(),
            Clause::Schedule(Schedule::of(ScheduleKind::Static))
        );
        assert_eq!("nowait".parse::<Clause>().unwrap(), Clause::NoWait);
        assert_eq!(
            "private(a, b)".parse::<Clause>().unwrap(),
            Clause::Private(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!("num_threads(3)".parse::<Clause>().unwrap(), Clause::NumThreads(3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("reduction(+acc)".parse::<Clause>(), Err(ConfigError::MalformedClause(_))));
        assert!(matches!("reduction(+:)".parse::<Clause>(), Err(ConfigError::MalformedClause(_))));
        assert!(matches!("ordered".parse::<Clause>(), Err(ConfigError::MalformedClause(_))));
        assert!(matches!("schedule(static".parse::<Clause>(), Err(ConfigError::MalformedClause(_))));
        assert_eq!(
            "schedule(sideways)".parse::<Clause>(),
            Err(ConfigError::UnknownScheduleKind("sideways".to_string()))
        );
        assert_eq!("num_threads(0)".parse::<Clause>(), Err(ConfigError::ZeroTeamSize));
    }

    #[test]
    fn test_clause_applicability() {
        assert!(Directive::For.allows(&Clause::NoWait));
        assert!(Directive::Single.allows(&Clause::NoWait));
        assert!(!Directive::Parallel.allows(&Clause::NoWait));
        assert!(Directive::ParallelFor.allows(&Clause::NumThreads(2)));
        assert!(!Directive::Critical.allows(&Clause::Schedule(Schedule::runtime())));

        let err = Directive::Single
            .validate(&[Clause::Reduction { var: "x".to_string(), op: ReductionOp::Add }])
            .unwrap_err();
        assert_eq!(err, ConfigError::ClauseNotAllowed { clause: "reduction", directive: "single" });
    }

    #[test]
    fn test_display_matches_parse() {
        for text in ["reduction(+:acc)", "schedule(dynamic,4)", "nowait", "private(i, j)"] {
            let clause: Clause = text.parse().unwrap();
            assert_eq!(clause.to_string(), text);
        }
    }
}
