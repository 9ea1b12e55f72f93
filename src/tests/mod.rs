// Test modules for Socialchat
// Each module contains unit tests for the corresponding source module

mod store_tests;
