//! Program factories shared by the unit tests.
