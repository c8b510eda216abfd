// Integration tests for the TCP acceptor and the node wiring, over real sockets.

mod acceptor;
mod helpers;
mod node;
