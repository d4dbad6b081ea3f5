// Static analysis tests that scan every Rust source file for tracing
// calls mentioning patient-data fields. Logs carry opaque ids only.
