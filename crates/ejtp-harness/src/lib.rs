//! Multi-node integration scenarios for EJTP: real loopback sockets wired
//! through `ejtp-transport`, exercising onion routing, duplicate-jack
//! rejection, and identity-cache persistence across independent routers
//! standing in for independent processes.

pub mod net;
