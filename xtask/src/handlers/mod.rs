pub(crate) mod check;
pub(crate) mod deploy;
pub(crate) mod run;
pub(crate) mod testing;
