//! Phase-space points.

/// Position, momentum and inert discrete state of one trajectory, plus the potential
/// energy and log-density gradient cached at the current position.
///
/// `q`, `p` and `g` always share the same length. `r` is carried along unchanged: the
/// Hamiltonian dynamics act on the continuous coordinates only.
#[derive(Debug, Clone, PartialEq)]
pub struct PsPoint {
    /// Position.
    pub q: Vec<f64>,
    /// Momentum.
    pub p: Vec<f64>,
    /// Discrete state, passed through untouched.
    pub r: Vec<i32>,
    /// Gradient of the log-density at `q`.
    pub g: Vec<f64>,
    /// Potential energy `-log pi(q)` at `q`.
    pub v: f64,
}

impl PsPoint {
    /// A zeroed point with `dim` continuous and `n_discrete` discrete coordinates.
    pub fn new(dim: usize, n_discrete: usize) -> Self {
        Self {
            q: vec![0.0; dim],
            p: vec![0.0; dim],
            r: vec![0; n_discrete],
            g: vec![0.0; dim],
            v: 0.0,
        }
    }

    /// A point positioned at `q` carrying the discrete state `r`, with zero momentum.
    pub fn from_state(q: &[f64], r: &[i32]) -> Self {
        Self {
            q: q.to_vec(),
            p: vec![0.0; q.len()],
            r: r.to_vec(),
            g: vec![0.0; q.len()],
            v: 0.0,
        }
    }

    pub fn dim(&self) -> usize {
        self.q.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_state_copies_inputs() {
        let z = PsPoint::from_state(&[1.0, -2.0], &[3]);
        assert_eq!(z.q, vec![1.0, -2.0]);
        assert_eq!(z.p, vec![0.0, 0.0]);
        assert_eq!(z.g.len(), 2);
        assert_eq!(z.r, vec![3]);
        assert_eq!(z.dim(), 2);
    }

    #[test]
    fn new_is_zeroed() {
        let z = PsPoint::new(3, 1);
        assert_eq!(z.q, vec![0.0; 3]);
        assert_eq!(z.r, vec![0]);
        assert_eq!(z.v, 0.0);
    }
}
