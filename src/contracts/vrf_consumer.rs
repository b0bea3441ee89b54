//! VRF v2 direct-funding consumer bindings
//!
//! `requestRandomWords()` is the payload relayed to the destination chain and
//! `RequestFulfilled` is the event the relay waits for.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IVrfConsumer {
        event RequestFulfilled(uint256 requestId, uint256[] randomWords, uint256 payment);

        function requestRandomWords() external returns (uint256 requestId);
    }
}
