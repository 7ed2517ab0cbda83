//! Compiled constraint tree and the boolean combinators
//!
//! Severity aggregation: AND takes the largest severity among violating
//! children, OR the smallest when every child violates, XOR the largest
//! among violating children. NOT flips the flag and keeps the margin, so a
//! double negation is the identity.

use super::airmass::AirmassEvaluator;
use super::alt_az::AltAzEvaluator;
use super::config::ConstraintConfig;
use super::core::{ConstraintEvaluator, Evaluation};
use super::daytime::DaytimeEvaluator;
use super::earth_limb::EarthLimbEvaluator;
use super::eclipse::EclipseEvaluator;
use super::moon_phase::MoonPhaseEvaluator;
use super::orbit_pole::OrbitPoleEvaluator;
use super::proximity::{ProximityEvaluator, Reference};
use super::saa::SAAEvaluator;
use crate::ephemeris::EphemerisSample;

/// Satisfied iff every input is satisfied
pub fn combine_and(evals: impl IntoIterator<Item = Evaluation>) -> Evaluation {
    let mut worst: Option<f64> = None;
    let mut margin = f64::INFINITY;
    for e in evals {
        if e.satisfied {
            margin = margin.min(e.margin());
        } else {
            worst = Some(worst.map_or(e.severity(), |w| w.max(e.severity())));
        }
    }
    match worst {
        Some(severity) => Evaluation::fail(severity),
        None => Evaluation::pass(if margin.is_finite() { margin } else { 0.0 }),
    }
}

/// Satisfied iff at least one input is satisfied
pub fn combine_or(evals: impl IntoIterator<Item = Evaluation>) -> Evaluation {
    let mut best: Option<f64> = None;
    let mut least = f64::INFINITY;
    for e in evals {
        if e.satisfied {
            best = Some(best.map_or(e.margin(), |b| b.max(e.margin())));
        } else {
            least = least.min(e.severity());
        }
    }
    match best {
        Some(margin) => Evaluation::pass(margin),
        None => Evaluation::fail(if least.is_finite() { least } else { 0.0 }),
    }
}

/// Satisfied iff exactly one input is satisfied
pub fn combine_xor(evals: impl IntoIterator<Item = Evaluation>) -> Evaluation {
    let mut satisfied = 0usize;
    let mut margin = 0.0;
    let mut worst = 0.0f64;
    for e in evals {
        if e.satisfied {
            satisfied += 1;
            margin = e.margin();
        } else {
            worst = worst.max(e.severity());
        }
    }
    if satisfied == 1 {
        Evaluation::pass(margin)
    } else {
        Evaluation::fail(worst)
    }
}

/// A compiled primitive
#[derive(Debug, Clone)]
pub(crate) enum Primitive {
    Proximity(ProximityEvaluator),
    EarthLimb(EarthLimbEvaluator),
    Eclipse(EclipseEvaluator),
    Daytime(DaytimeEvaluator),
    Airmass(AirmassEvaluator),
    MoonPhase(MoonPhaseEvaluator),
    Saa(SAAEvaluator),
    AltAz(AltAzEvaluator),
    OrbitPole(OrbitPoleEvaluator),
}

impl Primitive {
    fn evaluator(&self) -> &dyn ConstraintEvaluator {
        match self {
            Primitive::Proximity(e) => e,
            Primitive::EarthLimb(e) => e,
            Primitive::Eclipse(e) => e,
            Primitive::Daytime(e) => e,
            Primitive::Airmass(e) => e,
            Primitive::MoonPhase(e) => e,
            Primitive::Saa(e) => e,
            Primitive::AltAz(e) => e,
            Primitive::OrbitPole(e) => e,
        }
    }
}

/// Ephemeris fields a tree needs beyond the always-present positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Requirements {
    pub bodies: Vec<String>,
    pub velocity: bool,
    pub geodetic: bool,
}

/// Compiled constraint tree; each node owns its children
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Primitive(Primitive),
    And(Vec<Node>),
    Or(Vec<Node>),
    Xor(Vec<Node>),
    Not(Box<Node>),
}

impl Node {
    /// Compile a configuration; the configuration is expected to be validated
    pub(crate) fn compile(config: &ConstraintConfig) -> Node {
        let primitive = match config {
            ConstraintConfig::Sun(c) => Primitive::Proximity(c.to_evaluator(Reference::Sun)),
            ConstraintConfig::Moon(c) => Primitive::Proximity(c.to_evaluator(Reference::Moon)),
            ConstraintConfig::OrbitRam(c) => Primitive::Proximity(c.to_evaluator(Reference::Ram)),
            ConstraintConfig::Body(c) => Primitive::Proximity(c.to_evaluator()),
            ConstraintConfig::EarthLimb(c) => Primitive::EarthLimb(c.to_evaluator()),
            ConstraintConfig::Eclipse(c) => Primitive::Eclipse(c.to_evaluator()),
            ConstraintConfig::Daytime(c) => Primitive::Daytime(c.to_evaluator()),
            ConstraintConfig::Airmass(c) => Primitive::Airmass(c.to_evaluator()),
            ConstraintConfig::MoonPhase(c) => Primitive::MoonPhase(c.to_evaluator()),
            ConstraintConfig::Saa(c) => Primitive::Saa(c.to_evaluator()),
            ConstraintConfig::AltAz(c) => Primitive::AltAz(c.to_evaluator()),
            ConstraintConfig::OrbitPole(c) => Primitive::OrbitPole(c.to_evaluator()),
            ConstraintConfig::And(c) => return Node::And(c.constraints.iter().map(Node::compile).collect()),
            ConstraintConfig::Or(c) => return Node::Or(c.constraints.iter().map(Node::compile).collect()),
            ConstraintConfig::Xor(c) => return Node::Xor(c.constraints.iter().map(Node::compile).collect()),
            ConstraintConfig::Not(c) => return Node::Not(Box::new(Node::compile(&c.constraint))),
        };
        Node::Primitive(primitive)
    }

    pub(crate) fn evaluate(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        match self {
            Node::Primitive(p) => p.evaluator().evaluate_sample(sample, target),
            Node::And(children) => combine_and(children.iter().map(|c| c.evaluate(sample, target))),
            Node::Or(children) => combine_or(children.iter().map(|c| c.evaluate(sample, target))),
            Node::Xor(children) => combine_xor(children.iter().map(|c| c.evaluate(sample, target))),
            Node::Not(child) => child.evaluate(sample, target).negate(),
        }
    }

    pub(crate) fn name(&self) -> String {
        let join = |children: &[Node]| {
            children
                .iter()
                .map(Node::name)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Node::Primitive(p) => p.evaluator().name(),
            Node::And(children) => format!("AND({})", join(children)),
            Node::Or(children) => format!("OR({})", join(children)),
            Node::Xor(children) => format!("XOR({})", join(children)),
            Node::Not(child) => format!("NOT({})", child.name()),
        }
    }

    /// Text for violation intervals of this node
    pub(crate) fn violation_description(&self) -> String {
        match self {
            Node::Primitive(p) => p.evaluator().violation_description(),
            other => format!("{} violated", other.name()),
        }
    }

    pub(crate) fn requirements(&self) -> Requirements {
        let mut req = Requirements::default();
        self.collect_requirements(&mut req);
        req
    }

    fn collect_requirements(&self, req: &mut Requirements) {
        match self {
            Node::Primitive(Primitive::Proximity(p)) => match p.reference() {
                Reference::Body(name) => {
                    if !req.bodies.contains(name) {
                        req.bodies.push(name.clone());
                    }
                }
                Reference::Ram => req.velocity = true,
                Reference::Sun | Reference::Moon => {}
            },
            Node::Primitive(Primitive::OrbitPole(_)) => req.velocity = true,
            Node::Primitive(Primitive::Saa(_)) => req.geodetic = true,
            Node::Primitive(_) => {}
            Node::And(children) | Node::Or(children) | Node::Xor(children) => {
                children.iter().for_each(|c| c.collect_requirements(req))
            }
            Node::Not(child) => child.collect_requirements(req),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::orbit_pole::OrbitPoleConfig;

    #[test]
    fn test_and_takes_worst_violation() {
        let e = combine_and([Evaluation::pass(0.3), Evaluation::fail(0.2), Evaluation::fail(0.7)]);
        assert!(!e.satisfied);
        assert_eq!(e.severity(), 0.7);
        let ok = combine_and([Evaluation::pass(0.3), Evaluation::pass(0.1)]);
        assert!(ok.satisfied);
        assert_eq!(ok.margin(), 0.1);
    }

    #[test]
    fn test_or_takes_least_violation_when_all_fail() {
        let e = combine_or([Evaluation::fail(0.2), Evaluation::fail(0.7)]);
        assert!(!e.satisfied);
        assert_eq!(e.severity(), 0.2);
        let ok = combine_or([Evaluation::fail(0.2), Evaluation::pass(0.4)]);
        assert!(ok.satisfied);
        assert_eq!(ok.severity(), 0.0);
    }

    #[test]
    fn test_xor_requires_exactly_one() {
        assert!(combine_xor([Evaluation::pass(0.1), Evaluation::fail(0.4)]).satisfied);
        let both = combine_xor([Evaluation::pass(0.1), Evaluation::pass(0.2)]);
        assert!(!both.satisfied);
        assert_eq!(both.severity(), 0.0);
        let one_of_three =
            combine_xor([Evaluation::fail(0.1), Evaluation::fail(0.4), Evaluation::pass(0.0)]);
        assert!(one_of_three.satisfied);
        let none = combine_xor([Evaluation::fail(0.1), Evaluation::fail(0.4)]);
        assert_eq!(none.severity(), 0.4);
    }

    #[test]
    fn test_requirements_collected_once() {
        let config = ConstraintConfig::body("Mars", 5.0)
            & (ConstraintConfig::body("Mars", 10.0)
                | !ConstraintConfig::OrbitPole(OrbitPoleConfig {
                    min_angle: 10.0,
                    max_angle: None,
                    earth_limb_pole: false,
                }));
        let req = Node::compile(&config).requirements();
        assert_eq!(req.bodies, vec!["Mars".to_string()]);
        assert!(req.velocity);
        assert!(!req.geodetic);
    }
}
