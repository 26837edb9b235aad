use diffsol::{
    ConstantOp, LinearOp, NonLinearOp, NonLinearOpJacobian, OdeEquations, OdeEquationsRef, Op,
};

use super::rate::RateFunction;
use super::{M, T, V};

pub struct PkRhs<'a> {
    nstates: usize,
    rate: &'a RateFunction,
}

impl Op for PkRhs<'_> {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for PkRhs<'_> {
    fn call_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V) {
        self.rate.call_inplace(t, x.as_slice(), y.as_mut_slice());
    }
}

impl NonLinearOpJacobian for PkRhs<'_> {
    fn jac_mul_inplace(&self, _x: &Self::V, _t: Self::T, v: &Self::V, y: &mut Self::V) {
        self.rate.jac_mul_inplace(v.as_slice(), y.as_mut_slice());
    }
}

pub struct PkMass {
    nstates: usize,
}

impl Op for PkMass {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl LinearOp for PkMass {
    fn gemv_inplace(&self, _x: &Self::V, _t: Self::T, _beta: Self::T, _y: &mut Self::V) {}
}

pub struct PkInit {
    nstates: usize,
    init: V,
}

impl Op for PkInit {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl ConstantOp for PkInit {
    fn call_inplace(&self, _t: Self::T, y: &mut Self::V) {
        y.copy_from(&self.init);
    }
}

pub struct PkRoot {
    nstates: usize,
}

impl Op for PkRoot {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for PkRoot {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

pub struct PkOut {
    nstates: usize,
}

impl Op for PkOut {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for PkOut {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

/// A compartmental model posed as an initial value problem for diffsol
///
/// The problem owns its [RateFunction], so the topology and protocol it was built from
/// are free to change while the integrator runs.
pub struct PkProblem {
    rate: RateFunction,
    init: V,
}

impl PkProblem {
    pub fn new(rate: RateFunction, init: &[f64]) -> Self {
        Self {
            rate,
            init: V::from_column_slice(init),
        }
    }
}

impl Op for PkProblem {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.rate.nstates()
    }
    fn nout(&self) -> usize {
        self.rate.nstates()
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl<'b> OdeEquationsRef<'b> for PkProblem {
    type Rhs = PkRhs<'b>;
    type Mass = PkMass;
    type Init = PkInit;
    type Root = PkRoot;
    type Out = PkOut;
}

impl OdeEquations for PkProblem {
    fn rhs(&self) -> PkRhs<'_> {
        PkRhs {
            nstates: self.rate.nstates(),
            rate: &self.rate,
        }
    }

    fn mass(&self) -> Option<PkMass> {
        None
    }

    fn init(&self) -> PkInit {
        PkInit {
            nstates: self.rate.nstates(),
            init: self.init.clone(),
        }
    }

    fn get_params(&self, _p: &mut V) {}

    fn root(&self) -> Option<PkRoot> {
        None
    }

    fn out(&self) -> Option<PkOut> {
        None
    }

    fn set_params(&mut self, _p: &V) {}
}
