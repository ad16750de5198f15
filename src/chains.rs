//! Chain metadata: canonical chain names, token addresses, price-feed
//! registries, explorer links, and fixed-point amount conversion.
//!
//! The tables cover the chains the swap and oracle providers are deployed
//! on. Lookups are case-normalized; unknown entries return None and the
//! caller decides the fallback.

/// Chain used when a step names none.
pub const DEFAULT_CHAIN: &str = "ETHEREUM";

/// Mainnet ETH/USD Chainlink aggregator, the fallback when no feed resolves.
pub const FALLBACK_FEED: &str = "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419";

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: &'static str,
    pub decimals: u32,
}

/// Canonical uppercase/underscore chain identifier.
pub fn normalize(raw: &str) -> String {
    let canonical = raw.trim().to_uppercase().replace([' ', '-'], "_");
    let mapped = match canonical.as_str() {
        "" => DEFAULT_CHAIN,
        "ETH" | "MAINNET" | "ETHEREUM_MAINNET" | "L1" => "ETHEREUM",
        "ARB" | "ARBITRUM_ONE" => "ARBITRUM",
        "MATIC" | "POLYGON_POS" => "POLYGON",
        "BASE_MAINNET" => "BASE",
        other => other,
    };
    mapped.to_string()
}

/// Per-chain token registry. Native-asset symbols resolve to the wrapped
/// token the swap routers actually take.
pub fn token(chain: &str, symbol: &str) -> Option<TokenInfo> {
    let symbol = symbol.trim().to_uppercase();
    let (address, decimals) = match (chain, symbol.as_str()) {
        ("ETHEREUM", "ETH" | "WETH") => ("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18),
        ("ETHEREUM", "USDC") => ("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
        ("ETHEREUM", "USDT") => ("0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
        ("ETHEREUM", "DAI") => ("0x6B175474E89094C44Da98b954EedeAC495271d0F", 18),
        ("ETHEREUM", "WBTC") => ("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", 8),

        ("ARBITRUM", "ETH" | "WETH") => ("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", 18),
        ("ARBITRUM", "USDC") => ("0xaf88d065e77c8cC2239327C5EDb3A432268e5831", 6),
        ("ARBITRUM", "USDT") => ("0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", 6),
        ("ARBITRUM", "DAI") => ("0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1", 18),
        ("ARBITRUM", "WBTC") => ("0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f", 8),

        ("BASE", "ETH" | "WETH") => ("0x4200000000000000000000000000000000000006", 18),
        ("BASE", "USDC") => ("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", 6),
        ("BASE", "DAI") => ("0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb", 18),

        ("POLYGON", "MATIC" | "WMATIC") => ("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", 18),
        ("POLYGON", "USDC") => ("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6),
        ("POLYGON", "WETH" | "ETH") => ("0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", 18),

        _ => return None,
    };
    Some(TokenInfo { address, decimals })
}

/// Exact (chain, pair) Chainlink aggregator registry.
pub fn feed(chain: &str, pair: &str) -> Option<&'static str> {
    let address = match (chain, pair) {
        ("ETHEREUM", "ETH/USD") => "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419",
        ("ETHEREUM", "BTC/USD") => "0xF4030086522a5bEEa4988F8cA5B36dbC97BcE88C",
        ("ETHEREUM", "DAI/USD") => "0xAed0c38402a5d19df6E4c03F4E2DceD6e29c1ee9",
        ("ETHEREUM", "USDC/USD") => "0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6",
        ("ETHEREUM", "LINK/USD") => "0x2c1d072e956AFFC0D435Cb7AC38EF18d24d9127c",

        ("ARBITRUM", "ETH/USD") => "0x639Fe6ab55C921f74e7fac1ee960C0B6293ba612",
        ("ARBITRUM", "BTC/USD") => "0x6ce185860a4963106506C203335A2910413708e9",

        ("BASE", "ETH/USD") => "0x71041dddad3595F9CEd3DcCFBe3D1F4b0a16Bb70",

        ("POLYGON", "ETH/USD") => "0xF9680D99D6C9589e2a93a78A04A279e509205945",
        ("POLYGON", "MATIC/USD") => "0xAB594600376Ec9fD91F8e885dADF0CE036862dE0",

        _ => return None,
    };
    Some(address)
}

/// Normalize a free-text pair hint ("eth-usd", "ETH", "wbtc/usd") into the
/// `BASE/QUOTE` form the feed registry uses.
pub fn normalize_pair(raw: &str) -> String {
    let mut pair = raw.trim().to_uppercase().replace(['-', '_', ' '], "/");
    if !pair.contains('/') && !pair.is_empty() {
        pair = format!("{pair}/USD");
    }
    let parts: Vec<&str> = pair.split('/').filter(|part| !part.is_empty()).collect();
    fn normalize_asset(asset: &str) -> &str {
        match asset {
            "WETH" => "ETH",
            "WBTC" | "BITCOIN" => "BTC",
            "WMATIC" => "MATIC",
            other => other,
        }
    }
    match parts.as_slice() {
        [base] => format!("{}/USD", normalize_asset(base)),
        [base, quote] => format!("{}/{}", normalize_asset(base), quote),
        _ => pair.clone(),
    }
}

/// Per-chain block explorer transaction link, with a chain-agnostic
/// fallback for anything not in the table.
pub fn explorer_tx_url(chain: &str, hash: &str) -> String {
    let base = match chain {
        "ETHEREUM" => "https://etherscan.io/tx",
        "ARBITRUM" => "https://arbiscan.io/tx",
        "BASE" => "https://basescan.org/tx",
        "POLYGON" => "https://polygonscan.com/tx",
        _ => "https://blockscan.com/tx",
    };
    format!("{base}/{hash}")
}

/// Convert a human decimal amount ("1.5") into base units for the given
/// token decimals, truncating excess fractional precision. Returns None for
/// anything that is not a plain non-negative decimal number.
pub fn to_base_units(amount: &str, decimals: u32) -> Option<String> {
    let amount = amount.trim();
    if amount.is_empty() {
        return None;
    }
    let (integer, fraction) = match amount.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (amount, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(integer.len() + decimals);
    digits.push_str(integer);
    // Excess fractional digits are truncated, never rounded.
    let fraction: String = fraction.chars().take(decimals).collect();
    digits.push_str(&fraction);
    for _ in fraction.len()..decimals {
        digits.push('0');
    }

    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}
