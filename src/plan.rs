//! Expansion of check groups into the list of individual checks to run.
//!
//! A [`CheckGroup`] describes three independent axes: the toolchains to use, the targets to
//! compile for, and a [`FeaturePolicy`] that determines which feature sets to try.  The
//! [`Plan`] is the cartesian product of those axes for every group, in a deterministic order:
//! group, then toolchain, then target, then feature set.
//!
//! Nothing here is deduplicated.  Two groups that happen to produce the same check will run it
//! twice, which is harmless since checks have no side effects that matter to us.

use crate::{
    Result, error,
    invocation::{CompileTargets, Invocation, InvocationOptions},
    powerset::powerset,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

/// Default upper bound on the number of checks in a plan.
///
/// Feature sets are materialized before anything runs, so the limit is enforced on the computed
/// count before any group is expanded.
pub const DEFAULT_MAX_CHECKS: usize = 16384;

/// A set of feature names, kept in sorted order so that it always renders the same way.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<String>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.0.contains(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Join the features in canonical order with `separator`.
    pub fn joined(&self, separator: &str) -> String {
        self.iter().collect::<Vec<_>>().join(separator)
    }

    /// A new set containing the features of both sets.
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("(no features)")
        } else {
            f.write_str(&self.joined(","))
        }
    }
}

/// The parameters of a single `cargo check` run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckSpec {
    pub toolchain: String,

    /// Target triple, or `None` for the host target.
    pub target: Option<String>,

    pub features: FeatureSet,
}

/// How a group chooses the feature sets to check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum FeaturePolicy {
    /// Every subset of `features`, each combined with all of `mandatory`.
    Powerset {
        #[serde(default)]
        features: Vec<String>,

        #[serde(default)]
        mandatory: Vec<String>,
    },

    /// Every subset of `permutate`, tried once with each member of `iterate` (and all of
    /// `mandatory`).
    ///
    /// This grows linearly in the size of `iterate` rather than exponentially, which makes it
    /// possible to cover large feature lists where only a few features interact.
    PermuteIterate {
        #[serde(default)]
        permutate: Vec<String>,

        #[serde(default)]
        iterate: Vec<String>,

        #[serde(default)]
        mandatory: Vec<String>,
    },
}

impl FeaturePolicy {
    /// Expand the policy into the feature sets to check, in deterministic order.
    pub fn feature_sets(&self) -> Vec<FeatureSet> {
        match self {
            Self::Powerset {
                features,
                mandatory,
            } => {
                let mandatory = mandatory.iter().collect::<FeatureSet>();

                powerset(features)
                    .into_iter()
                    .map(|subset| subset.into_iter().collect::<FeatureSet>().union(&mandatory))
                    .collect()
            }
            Self::PermuteIterate {
                permutate,
                iterate,
                mandatory,
            } => {
                let mandatory = mandatory.iter().collect::<FeatureSet>();
                let permutations = powerset(permutate);

                iterate
                    .iter()
                    .flat_map(|iterated| {
                        let base = std::iter::once(iterated).collect::<FeatureSet>().union(&mandatory);
                        permutations
                            .iter()
                            .map(move |subset| subset.iter().collect::<FeatureSet>().union(&base))
                    })
                    .collect()
            }
        }
    }

    /// Number of feature sets [`Self::feature_sets`] will produce, without producing them.
    ///
    /// Saturates rather than overflowing for absurdly large feature lists.
    pub fn len(&self) -> usize {
        fn subsets(n: usize) -> usize {
            u32::try_from(n)
                .ok()
                .and_then(|n| 1usize.checked_shl(n))
                .unwrap_or(usize::MAX)
        }

        match self {
            Self::Powerset { features, .. } => subsets(features.len()),
            Self::PermuteIterate {
                permutate, iterate, ..
            } => subsets(permutate.len()).saturating_mul(iterate.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the feature lists for problems that would make the expansion wrong.
    ///
    /// Labels must be non-empty single names, since they are joined with commas into one
    /// `--features` argument.  Each list must not repeat a label since the subset generator
    /// treats its input as distinct items.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        let lists: Vec<(&str, &Vec<String>)> = match self {
            Self::Powerset {
                features,
                mandatory,
            } => vec![("features", features), ("mandatory", mandatory)],
            Self::PermuteIterate {
                permutate,
                iterate,
                mandatory,
            } => vec![
                ("permutate", permutate),
                ("iterate", iterate),
                ("mandatory", mandatory),
            ],
        };

        for (field, labels) in lists {
            let mut seen = BTreeSet::new();
            for label in labels {
                if label.trim().is_empty() {
                    return Err(format!("'{field}' contains an empty feature name"));
                }
                if label.contains(|c: char| c == ',' || c.is_whitespace()) {
                    return Err(format!(
                        "'{field}' contains '{label}', which is not a single feature name"
                    ));
                }
                if !seen.insert(label.as_str()) {
                    return Err(format!("'{field}' lists feature '{label}' more than once"));
                }
            }
        }

        Ok(())
    }
}

fn default_toolchains() -> Vec<String> {
    vec!["stable".to_string()]
}

/// One `[[check]]` entry in the config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckGroup {
    /// Optional name used in messages; groups are otherwise identified by position.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_toolchains")]
    pub toolchains: Vec<String>,

    /// Explicit target triples.  When empty, the target given on the command line is used, or
    /// the host target if there is none.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Fail instead of falling back to the host target when `targets` is empty and no target was
    /// given on the command line.
    #[serde(default)]
    pub require_target: bool,

    /// Overrides the global `compile` setting for this group.
    #[serde(default)]
    pub compile: Option<CompileTargets>,

    #[serde(flatten)]
    pub policy: FeaturePolicy,
}

impl CheckGroup {
    /// Construct a group that checks the powerset of `features` on the given toolchains.
    pub fn powerset(toolchains: Vec<String>, features: Vec<String>) -> Self {
        Self {
            name: None,
            toolchains,
            targets: Vec::new(),
            require_target: false,
            compile: None,
            policy: FeaturePolicy::Powerset {
                features,
                mandatory: Vec::new(),
            },
        }
    }

    /// The name used to refer to this group in messages.
    pub fn label(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("#{}", index + 1))
    }

    fn targets(&self, index: usize, cli_target: Option<&str>) -> Result<Vec<Option<String>>> {
        if !self.targets.is_empty() {
            return Ok(self.targets.iter().cloned().map(Some).collect());
        }

        match cli_target {
            Some(target) => Ok(vec![Some(target.to_string())]),
            None if self.require_target => error::MissingTargetSnafu {
                group: self.label(index),
            }
            .fail(),
            None => Ok(vec![None]),
        }
    }
}

/// A check spec together with the group-level settings needed to build its invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedCheck {
    pub group: String,
    pub spec: CheckSpec,
    pub compile: CompileTargets,
}

impl PlannedCheck {
    pub fn invocation(&self, options: &InvocationOptions) -> Invocation {
        Invocation::build(&self.spec, self.compile, options)
    }
}

/// The full, ordered list of checks to run.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    checks: Vec<PlannedCheck>,
}

impl Plan {
    /// Expand `groups` into a plan.
    ///
    /// Target resolution happens for every group before anything is returned, so a group that
    /// requires a target fails the whole plan rather than silently dropping out.
    ///
    /// Fails with [`crate::Error::PlanTooLarge`] if the plan would hold more than `max_checks`
    /// checks.  The count is computed from the group definitions first, so an oversized group is
    /// rejected without expanding it.
    pub fn build(
        groups: &[CheckGroup],
        cli_target: Option<&str>,
        default_compile: CompileTargets,
        max_checks: usize,
    ) -> Result<Self> {
        let mut resolved = Vec::with_capacity(groups.len());
        let mut total = 0usize;

        for (index, group) in groups.iter().enumerate() {
            let label = group.label(index);
            let targets = group.targets(index, cli_target)?;

            let count = group
                .policy
                .len()
                .saturating_mul(group.toolchains.len())
                .saturating_mul(targets.len());
            total = total.saturating_add(count);
            if total > max_checks {
                return error::PlanTooLargeSnafu {
                    group: label,
                    checks: total,
                    max_checks,
                }
                .fail();
            }

            resolved.push((label, targets));
        }

        let mut checks = Vec::with_capacity(total);

        for (group, (label, targets)) in groups.iter().zip(resolved) {
            let compile = group.compile.unwrap_or(default_compile);
            let feature_sets = group.policy.feature_sets();

            if feature_sets.is_empty() {
                tracing::warn!("Check group {label} produces no feature sets; nothing to check");
            }

            for toolchain in &group.toolchains {
                for target in &targets {
                    for features in &feature_sets {
                        checks.push(PlannedCheck {
                            group: label.clone(),
                            spec: CheckSpec {
                                toolchain: toolchain.clone(),
                                target: target.clone(),
                                features: features.clone(),
                            },
                            compile,
                        });
                    }
                }
            }

            tracing::debug!(
                group = %label,
                toolchains = group.toolchains.len(),
                targets = targets.len(),
                feature_sets = feature_sets.len(),
                "Expanded check group"
            );
        }

        Ok(Self { checks })
    }

    pub fn checks(&self) -> &[PlannedCheck] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Build the invocation for every check, in plan order.
    pub fn invocations(&self, options: &InvocationOptions) -> Vec<Invocation> {
        self.checks.iter().map(|check| check.invocation(options)).collect()
    }
}
