mod convert;
mod health_check;
mod webhook;
