mod init;
mod param_gen;

pub use init::Init;
pub use param_gen::ParamGen;
