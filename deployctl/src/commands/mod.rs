//! One module per subcommand. Each validates its flags in order, performs
//! its single remote action through `deployctl-core`, and reports through
//! [`crate::report::Script`].

pub mod frontend_build;
pub mod frontend_deploy;
pub mod jenkins_trigger;
