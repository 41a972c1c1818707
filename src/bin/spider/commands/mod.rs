// Commands module

pub mod run;

pub use run::execute_run;
