use alloy::sol;

sol! {
    /// Call surface of the deployed testament contract.
    interface ITestament {
        function getDocumentHash() external view returns (string memory);
        function confirmDeath() external;
        function unlockTestament() external returns (string memory);
        function isDeceased() external view returns (bool);
        function heir() external view returns (address);
        function notary() external view returns (address);
        function unlockTime() external view returns (uint256);
        function testator() external view returns (address);
    }
}
