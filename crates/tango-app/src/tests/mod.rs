mod profile_tests;
mod session_tests;
