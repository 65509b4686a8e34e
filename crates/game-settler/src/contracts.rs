//! Minimal bindings for the contracts the settler talks to.

use alloy::sol;

sol! {
    /// League pool variant that identifies the winning token by its name.
    #[sol(rpc)]
    interface LeaguePoolByName {
        function forwardFeesToBC(string tokenName) external;
    }

    /// League pool variant that identifies the winning token by its address.
    #[sol(rpc)]
    interface LeaguePoolByAddress {
        function forwardFeesToBC(address token) external;
    }

    /// Team token with a buy-back mechanism that burns the bought tokens.
    #[sol(rpc)]
    interface TeamToken {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function buybackAndBurn() external;
        function decimals() external view returns (uint8);
    }
}
