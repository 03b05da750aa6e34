pub(crate) mod check;
pub(crate) mod criteria;
pub(crate) mod review;
pub(crate) mod submit;
