// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential registry contract interface.

use alloy::sol;

// Credential ids are passed as keccak256(utf8(id)); see `credential::chain_credential_id`.
sol! {
    #[sol(rpc)]
    interface ICredentialRegistry {
        struct BatchCredential {
            bytes32 id;
            string recipient;
            bytes32 credentialHash;
            string metadataURI;
        }

        struct InstitutionRecord {
            string name;
            uint8 status;
            string accreditationProof;
            address[] verifiers;
        }

        function registerInstitution(string name, string accreditationProof, uint256 requiredVerifiers) external;
        function verifyInstitution(address institution) external;
        function getInstitution(address institution) external view returns (InstitutionRecord memory);

        function issueCredential(bytes32 id, string recipient, bytes32 credentialHash, string metadataURI) external;
        function issueBatchCredentials(BatchCredential[] credentials) external;
        function verifyCredential(bytes32 id, bytes32 credentialHash) external view returns (bool isValid, address issuer, uint256 issueDate, string metadataURI);
    }
}
