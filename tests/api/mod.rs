mod address_tests;
mod auth_tests;
mod health_tests;
mod webhook_tests;
